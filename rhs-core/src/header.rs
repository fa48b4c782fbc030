//! RHS header decoding.
//!
//! The header is a fixed sequence of fields with no framing beyond the magic
//! number, so fields are read strictly in file order and any error aborts the
//! whole decode.

use crate::error::{Result, RhsError};
use crate::reader::FieldReader;
use crate::types::{
    Channel, ChannelCatalog, ChannelKind, FrequencyParameters, Header, Impedance, Notes,
    SignalType, StimParameters, TriggerSpec, Version,
};
use std::path::Path;
use tracing::{debug, trace};

/// Magic number at the start of every RHS header.
pub const RHS_MAGIC: u32 = 0xD691_27AC;

/// Maps the stored notch filter mode to a frequency in Hz.
///
/// Unknown modes are treated as "no notch" rather than rejected.
#[inline]
pub fn notch_frequency_from_mode(mode: i16) -> u32 {
    match mode {
        1 => 50,
        2 => 60,
        _ => 0,
    }
}

/// Channel record as stored, before the enabled/type filter is applied.
#[derive(Debug)]
struct RawChannel {
    offset: usize,
    native_name: String,
    custom_name: String,
    native_order: i16,
    custom_order: i16,
    signal_type: i16,
    enabled: bool,
    chip_channel: i16,
    board_stream: i16,
    trigger: TriggerSpec,
    impedance: Impedance,
}

impl RawChannel {
    fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let native_name = reader.read_qstring()?;
        let custom_name = reader.read_qstring()?;
        let native_order = reader.read_i16()?;
        let custom_order = reader.read_i16()?;
        let signal_type = reader.read_i16()?;
        let enabled = reader.read_i16()? != 0;
        let chip_channel = reader.read_i16()?;
        let _command_stream = reader.read_i16()?;
        let board_stream = reader.read_i16()?;

        let trigger = TriggerSpec {
            voltage_trigger_mode: reader.read_i16()?,
            voltage_threshold: reader.read_i16()?,
            digital_trigger_channel: reader.read_i16()?,
            digital_edge_polarity: reader.read_i16()?,
        };
        let impedance = Impedance {
            magnitude: reader.read_f32()?,
            phase: reader.read_f32()?,
        };

        Ok(Self {
            offset,
            native_name,
            custom_name,
            native_order,
            custom_order,
            signal_type,
            enabled,
            chip_channel,
            board_stream,
            trigger,
            impedance,
        })
    }

    /// Resolves the signal-type code into a channel kind.
    fn kind(&self) -> Result<ChannelKind> {
        match SignalType::from_code(self.signal_type) {
            Some(SignalType::Amplifier) => Ok(ChannelKind::Amplifier {
                trigger: self.trigger,
                impedance: self.impedance,
            }),
            Some(SignalType::BoardAdc) => Ok(ChannelKind::BoardAdc),
            Some(SignalType::BoardDac) => Ok(ChannelKind::BoardDac),
            Some(SignalType::BoardDigIn) => Ok(ChannelKind::BoardDigIn),
            Some(SignalType::BoardDigOut) => Ok(ChannelKind::BoardDigOut),
            Some(SignalType::AuxInput) | Some(SignalType::SupplyVoltage) => {
                Err(RhsError::UnsupportedChannelType {
                    code: self.signal_type,
                    channel: self.native_name.clone(),
                    offset: self.offset,
                })
            }
            None => Err(RhsError::UnknownChannelType {
                code: self.signal_type,
                channel: self.native_name.clone(),
                offset: self.offset,
            }),
        }
    }
}

/// Port-level scope shared by the channels of one signal group.
struct SignalGroup {
    name: String,
    prefix: String,
    number: u16,
}

impl SignalGroup {
    fn channel(&self, raw: RawChannel, kind: ChannelKind) -> Channel {
        Channel {
            native_name: raw.native_name,
            custom_name: raw.custom_name,
            port_name: self.name.clone(),
            port_prefix: self.prefix.clone(),
            port_number: self.number,
            native_order: raw.native_order,
            custom_order: raw.custom_order,
            chip_channel: raw.chip_channel,
            board_stream: raw.board_stream,
            kind,
        }
    }
}

impl Header {
    /// Decodes a header from the start of `data`.
    ///
    /// Bytes after the last channel record are ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = FieldReader::new(data);

        let magic = reader.read_u32()?;
        if magic != RHS_MAGIC {
            return Err(RhsError::BadMagic {
                expected: RHS_MAGIC,
                found: magic,
            });
        }

        let version = Version {
            major: reader.read_i16()?,
            minor: reader.read_i16()?,
        };
        debug!(major = version.major, minor = version.minor, "Reading RHS header");

        let sample_rate = reader.read_f32()?;
        let dsp_enabled = reader.read_i16()?;
        let actual_dsp_cutoff_frequency = reader.read_f32()?;
        let actual_lower_bandwidth = reader.read_f32()?;
        let actual_lower_settle_bandwidth = reader.read_f32()?;
        let actual_upper_bandwidth = reader.read_f32()?;
        let desired_dsp_cutoff_frequency = reader.read_f32()?;
        let desired_lower_bandwidth = reader.read_f32()?;
        let desired_lower_settle_bandwidth = reader.read_f32()?;
        let desired_upper_bandwidth = reader.read_f32()?;

        let notch_filter_frequency = notch_frequency_from_mode(reader.read_i16()?);

        let desired_impedance_test_frequency = reader.read_f32()?;
        let actual_impedance_test_frequency = reader.read_f32()?;
        let amp_settle_mode = reader.read_i16()?;
        let charge_recovery_mode = reader.read_i16()?;

        let frequency_parameters = FrequencyParameters {
            amplifier_sample_rate: sample_rate,
            board_adc_sample_rate: sample_rate,
            board_dig_in_sample_rate: sample_rate,
            dsp_enabled,
            desired_dsp_cutoff_frequency,
            actual_dsp_cutoff_frequency,
            desired_lower_bandwidth,
            actual_lower_bandwidth,
            desired_lower_settle_bandwidth,
            actual_lower_settle_bandwidth,
            desired_upper_bandwidth,
            actual_upper_bandwidth,
            notch_filter_frequency,
            desired_impedance_test_frequency,
            actual_impedance_test_frequency,
        };

        let stim = StimParameters {
            stim_step_size: reader.read_f32()?,
            charge_recovery_current_limit: reader.read_f32()?,
            charge_recovery_target_voltage: reader.read_f32()?,
            amp_settle_mode,
            charge_recovery_mode,
        };

        let notes = Notes {
            note1: reader.read_qstring()?,
            note2: reader.read_qstring()?,
            note3: reader.read_qstring()?,
        };

        let dc_amplifier_data_saved = reader.read_i16()? != 0;
        let eval_board_mode = reader.read_i16()?;
        let reference_channel = reader.read_qstring()?;

        let channels = read_signal_groups(&mut reader)?;

        if reader.remaining() > 0 {
            debug!(
                trailing = reader.remaining(),
                "Ignoring bytes after channel records"
            );
        }

        let counts = channels.counts();
        debug!(
            amplifier = counts.amplifier,
            board_adc = counts.board_adc,
            board_dac = counts.board_dac,
            board_dig_in = counts.board_dig_in,
            board_dig_out = counts.board_dig_out,
            "Decoded channel catalog"
        );

        Ok(Self {
            version,
            sample_rate,
            frequency_parameters,
            stim,
            notes,
            dc_amplifier_data_saved,
            eval_board_mode,
            reference_channel,
            channels,
        })
    }

    /// Reads and decodes a standalone header file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| RhsError::io(path, e))?;
        Self::decode(&data)
    }
}

/// Reads every signal group and classifies its enabled channels.
fn read_signal_groups(reader: &mut FieldReader<'_>) -> Result<ChannelCatalog> {
    let mut catalog = ChannelCatalog::default();
    let group_count = reader.read_i16()?;
    debug!(groups = group_count, "Reading signal groups");

    // Group numbers are 1-based; a negative count reads no groups
    for number in 1..=group_count.max(0) as u16 {
        let group = SignalGroup {
            name: reader.read_qstring()?,
            prefix: reader.read_qstring()?,
            number,
        };
        // Only a positive flag enables a group; its channel records are absent otherwise
        let enabled = reader.read_i16()? > 0;
        let num_channels = reader.read_i16()?;
        let _num_amp_channels = reader.read_i16()?;

        trace!(
            group = number,
            name = %group.name,
            enabled,
            channels = num_channels,
            "Signal group"
        );

        if !enabled || num_channels <= 0 {
            continue;
        }

        for _ in 0..num_channels {
            let raw = RawChannel::read(reader)?;
            if !raw.enabled {
                continue;
            }
            let kind = raw.kind()?;
            trace!(channel = %raw.native_name, code = raw.signal_type, "Retained channel");
            catalog.push(group.channel(raw, kind));
        }
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notch_mode_mapping() {
        assert_eq!(notch_frequency_from_mode(0), 0);
        assert_eq!(notch_frequency_from_mode(1), 50);
        assert_eq!(notch_frequency_from_mode(2), 60);
        assert_eq!(notch_frequency_from_mode(3), 0);
        assert_eq!(notch_frequency_from_mode(-1), 0);
    }

    #[test]
    fn test_bad_magic() {
        let data = 0x1234_5678u32.to_le_bytes();
        match Header::decode(&data) {
            Err(RhsError::BadMagic { expected, found }) => {
                assert_eq!(expected, RHS_MAGIC);
                assert_eq!(found, 0x1234_5678);
            }
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_magic_only_is_truncated() {
        let data = RHS_MAGIC.to_le_bytes();
        assert!(matches!(
            Header::decode(&data),
            Err(RhsError::TruncatedInput { offset: 4, .. })
        ));
    }

    #[test]
    fn test_empty_input_is_truncated() {
        assert!(matches!(
            Header::decode(&[]),
            Err(RhsError::TruncatedInput { offset: 0, .. })
        ));
    }

    fn raw_channel(signal_type: i16) -> RawChannel {
        RawChannel {
            offset: 0,
            native_name: "X-000".to_string(),
            custom_name: "X-000".to_string(),
            native_order: 0,
            custom_order: 0,
            signal_type,
            enabled: true,
            chip_channel: 0,
            board_stream: 0,
            trigger: TriggerSpec::default(),
            impedance: Impedance::default(),
        }
    }

    #[test]
    fn test_channel_kind_codes() {
        assert!(matches!(
            raw_channel(0).kind(),
            Ok(ChannelKind::Amplifier { .. })
        ));
        assert_eq!(raw_channel(3).kind().unwrap(), ChannelKind::BoardAdc);
        assert_eq!(raw_channel(4).kind().unwrap(), ChannelKind::BoardDac);
        assert_eq!(raw_channel(5).kind().unwrap(), ChannelKind::BoardDigIn);
        assert_eq!(raw_channel(6).kind().unwrap(), ChannelKind::BoardDigOut);

        for code in [1, 2] {
            assert!(matches!(
                raw_channel(code).kind(),
                Err(RhsError::UnsupportedChannelType { .. })
            ));
        }
        for code in [7, 42, -1] {
            assert!(matches!(
                raw_channel(code).kind(),
                Err(RhsError::UnknownChannelType { .. })
            ));
        }
    }
}

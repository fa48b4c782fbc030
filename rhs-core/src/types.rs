//! Core types for decoded RHS recordings.
//!
//! This module defines the header sub-records, the classified channel
//! catalog, and the assembled recording returned by the loader.

use std::collections::BTreeMap;

/// File format version stored after the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: i16,
    pub minor: i16,
}

/// Amplifier and filter settings.
///
/// The three sample rates are all copies of the single rate stored in the
/// file; RHS boards sample every stream at the amplifier rate.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyParameters {
    pub amplifier_sample_rate: f32,
    pub board_adc_sample_rate: f32,
    pub board_dig_in_sample_rate: f32,
    pub dsp_enabled: i16,
    pub desired_dsp_cutoff_frequency: f32,
    pub actual_dsp_cutoff_frequency: f32,
    pub desired_lower_bandwidth: f32,
    pub actual_lower_bandwidth: f32,
    pub desired_lower_settle_bandwidth: f32,
    pub actual_lower_settle_bandwidth: f32,
    pub desired_upper_bandwidth: f32,
    pub actual_upper_bandwidth: f32,
    /// 0 (disabled), 50 or 60 Hz
    pub notch_filter_frequency: u32,
    pub desired_impedance_test_frequency: f32,
    pub actual_impedance_test_frequency: f32,
}

/// Stimulation and charge-recovery settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StimParameters {
    /// Current represented by one step of a stim sample, in amperes
    pub stim_step_size: f32,
    pub charge_recovery_current_limit: f32,
    pub charge_recovery_target_voltage: f32,
    pub amp_settle_mode: i16,
    pub charge_recovery_mode: i16,
}

/// Free-text notes entered at acquisition time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notes {
    pub note1: String,
    pub note2: String,
    pub note3: String,
}

/// Spike/voltage trigger configuration of one amplifier channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerSpec {
    pub voltage_trigger_mode: i16,
    pub voltage_threshold: i16,
    pub digital_trigger_channel: i16,
    pub digital_edge_polarity: i16,
}

/// Electrode impedance measured before acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Impedance {
    pub magnitude: f32,
    pub phase: f32,
}

/// Raw signal-type codes stored in each channel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum SignalType {
    Amplifier = 0,
    /// Auxiliary input (RHD only)
    AuxInput = 1,
    /// Supply voltage (RHD only)
    SupplyVoltage = 2,
    BoardAdc = 3,
    BoardDac = 4,
    BoardDigIn = 5,
    BoardDigOut = 6,
}

impl SignalType {
    /// Attempts to parse a signal type from its on-disk code.
    #[inline]
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Amplifier),
            1 => Some(Self::AuxInput),
            2 => Some(Self::SupplyVoltage),
            3 => Some(Self::BoardAdc),
            4 => Some(Self::BoardDac),
            5 => Some(Self::BoardDigIn),
            6 => Some(Self::BoardDigOut),
            _ => None,
        }
    }
}

/// Kind of a retained channel, with the data only amplifiers carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelKind {
    Amplifier {
        trigger: TriggerSpec,
        impedance: Impedance,
    },
    BoardAdc,
    BoardDac,
    BoardDigIn,
    BoardDigOut,
}

/// One enabled signal channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub native_name: String,
    pub custom_name: String,
    /// Name of the signal group (port) the channel belongs to
    pub port_name: String,
    pub port_prefix: String,
    /// 1-based index of the signal group in the header
    pub port_number: u16,
    pub native_order: i16,
    pub custom_order: i16,
    pub chip_channel: i16,
    pub board_stream: i16,
    pub kind: ChannelKind,
}

impl Channel {
    /// Returns the trigger configuration if this is an amplifier channel.
    pub fn trigger(&self) -> Option<&TriggerSpec> {
        match &self.kind {
            ChannelKind::Amplifier { trigger, .. } => Some(trigger),
            _ => None,
        }
    }

    /// Returns the electrode impedance if this is an amplifier channel.
    pub fn impedance(&self) -> Option<&Impedance> {
        match &self.kind {
            ChannelKind::Amplifier { impedance, .. } => Some(impedance),
            _ => None,
        }
    }
}

/// Number of retained channels per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCounts {
    pub amplifier: usize,
    pub board_adc: usize,
    pub board_dac: usize,
    pub board_dig_in: usize,
    pub board_dig_out: usize,
}

impl ChannelCounts {
    pub fn total(&self) -> usize {
        self.amplifier + self.board_adc + self.board_dac + self.board_dig_in + self.board_dig_out
    }
}

/// Enabled channels classified by kind, in header order.
///
/// Counts are always derived from the stored sequences; nothing read from
/// the file can make them disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelCatalog {
    amplifier: Vec<Channel>,
    board_adc: Vec<Channel>,
    board_dac: Vec<Channel>,
    board_dig_in: Vec<Channel>,
    board_dig_out: Vec<Channel>,
}

impl ChannelCatalog {
    /// Appends a channel to the sequence matching its kind.
    pub(crate) fn push(&mut self, channel: Channel) {
        let list = match channel.kind {
            ChannelKind::Amplifier { .. } => &mut self.amplifier,
            ChannelKind::BoardAdc => &mut self.board_adc,
            ChannelKind::BoardDac => &mut self.board_dac,
            ChannelKind::BoardDigIn => &mut self.board_dig_in,
            ChannelKind::BoardDigOut => &mut self.board_dig_out,
        };
        list.push(channel);
    }

    pub fn amplifier_channels(&self) -> &[Channel] {
        &self.amplifier
    }

    pub fn board_adc_channels(&self) -> &[Channel] {
        &self.board_adc
    }

    pub fn board_dac_channels(&self) -> &[Channel] {
        &self.board_dac
    }

    pub fn board_dig_in_channels(&self) -> &[Channel] {
        &self.board_dig_in
    }

    pub fn board_dig_out_channels(&self) -> &[Channel] {
        &self.board_dig_out
    }

    /// Trigger settings, one per amplifier channel in the same order.
    pub fn spike_triggers(&self) -> impl Iterator<Item = &TriggerSpec> + '_ {
        self.amplifier.iter().filter_map(Channel::trigger)
    }

    /// All retained channels, amplifiers first.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.amplifier
            .iter()
            .chain(&self.board_adc)
            .chain(&self.board_dac)
            .chain(&self.board_dig_in)
            .chain(&self.board_dig_out)
    }

    pub fn counts(&self) -> ChannelCounts {
        ChannelCounts {
            amplifier: self.amplifier.len(),
            board_adc: self.board_adc.len(),
            board_dac: self.board_dac.len(),
            board_dig_in: self.board_dig_in.len(),
            board_dig_out: self.board_dig_out.len(),
        }
    }

    pub fn num_amplifier_channels(&self) -> usize {
        self.amplifier.len()
    }

    pub fn num_board_adc_channels(&self) -> usize {
        self.board_adc.len()
    }

    pub fn num_board_dac_channels(&self) -> usize {
        self.board_dac.len()
    }

    pub fn num_board_dig_in_channels(&self) -> usize {
        self.board_dig_in.len()
    }

    pub fn num_board_dig_out_channels(&self) -> usize {
        self.board_dig_out.len()
    }
}

/// Decoded acquisition header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: Version,
    pub sample_rate: f32,
    pub frequency_parameters: FrequencyParameters,
    pub stim: StimParameters,
    pub notes: Notes,
    pub dc_amplifier_data_saved: bool,
    pub eval_board_mode: i16,
    pub reference_channel: String,
    pub channels: ChannelCatalog,
}

/// Result of loading a recording directory.
#[derive(Debug, Clone)]
pub struct RecordingSet {
    pub header: Header,
    /// Sample times in seconds
    pub timestamps: Vec<f64>,
    /// Calibrated samples keyed by data-file stem
    pub recordings: BTreeMap<String, Vec<f64>>,
}

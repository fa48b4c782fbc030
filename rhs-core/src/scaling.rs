//! Classification and calibration of per-channel data files.
//!
//! Each data file holds one channel as a flat little-endian sample array with
//! no header. The file name says what the channel is and therefore how raw
//! samples convert to physical units.

use byteorder::{ByteOrder, LittleEndian};

/// Microvolts per amplifier LSB.
pub const AMPLIFIER_UV_PER_BIT: f64 = 0.195;
/// Volts per board analog LSB, around a 32768 midpoint.
pub const BOARD_ANALOG_V_PER_BIT: f64 = 0.000_312_5;
pub const BOARD_ANALOG_OFFSET: f64 = 32768.0;
/// Millivolts per DC amplifier LSB, around a 512 midpoint.
pub const DC_AMPLIFIER_MV_PER_BIT: f64 = 19.23;
pub const DC_AMPLIFIER_OFFSET: f64 = 512.0;

/// Semantic role of a data file, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFileKind {
    /// `amp-*`: int16, scaled to µV
    Amplifier,
    /// `board-ANALOG-IN-*` / `board-ANALOG-OUT-*`: uint16, scaled to V
    BoardAnalog,
    /// `dc-*`: uint16, scaled to mV
    DcAmplifier,
    /// `board-DIGITAL-IN-*` / `board-DIGITAL-OUT-*`: uint16, unscaled
    BoardDigital,
    /// `stim-*`: uint16 sign/magnitude, scaled by the stim step size
    Stimulation,
}

/// Substring rules in priority order; the first match wins.
pub const CLASSIFICATION_RULES: &[(&str, DataFileKind)] = &[
    ("amp", DataFileKind::Amplifier),
    ("board-ANALOG-IN", DataFileKind::BoardAnalog),
    ("board-ANALOG-OUT", DataFileKind::BoardAnalog),
    ("dc-", DataFileKind::DcAmplifier),
    ("board-DIGITAL-IN", DataFileKind::BoardDigital),
    ("board-DIGITAL-OUT", DataFileKind::BoardDigital),
    ("stim-", DataFileKind::Stimulation),
];

impl DataFileKind {
    /// Classifies a bare file name (no directory components).
    pub fn classify(file_name: &str) -> Option<Self> {
        CLASSIFICATION_RULES
            .iter()
            .find(|(needle, _)| file_name.contains(needle))
            .map(|&(_, kind)| kind)
    }

    /// Width of one raw sample in bytes.
    #[inline]
    pub fn sample_width(&self) -> usize {
        2
    }

    /// Unit of the calibrated output.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Amplifier => "uV",
            Self::BoardAnalog => "V",
            Self::DcAmplifier => "mV",
            Self::BoardDigital => "raw",
            Self::Stimulation => "A",
        }
    }

    /// Converts raw little-endian samples to calibrated values.
    ///
    /// This does not validate the input length: a trailing partial sample is
    /// dropped without error. Callers that must reject partial samples check
    /// `bytes.len() % self.sample_width()` first, as the directory loader does
    /// with [`RhsError::PartialSample`](crate::RhsError::PartialSample).
    pub fn scale(&self, bytes: &[u8], stim_step_size: f32) -> Vec<f64> {
        let whole = bytes.len() - bytes.len() % self.sample_width();
        let bytes = &bytes[..whole];
        let step = f64::from(stim_step_size);

        match self {
            Self::Amplifier => read_i16s(bytes).into_iter().map(scale_amplifier).collect(),
            Self::BoardAnalog => read_u16s(bytes)
                .into_iter()
                .map(scale_board_analog)
                .collect(),
            Self::DcAmplifier => read_u16s(bytes)
                .into_iter()
                .map(scale_dc_amplifier)
                .collect(),
            Self::BoardDigital => read_u16s(bytes).into_iter().map(f64::from).collect(),
            Self::Stimulation => read_u16s(bytes)
                .into_iter()
                .map(|v| scale_stimulation(v, step))
                .collect(),
        }
    }
}

fn read_i16s(bytes: &[u8]) -> Vec<i16> {
    let mut out = vec![0i16; bytes.len() / 2];
    LittleEndian::read_i16_into(bytes, &mut out);
    out
}

fn read_u16s(bytes: &[u8]) -> Vec<u16> {
    let mut out = vec![0u16; bytes.len() / 2];
    LittleEndian::read_u16_into(bytes, &mut out);
    out
}

#[inline]
pub fn scale_amplifier(raw: i16) -> f64 {
    f64::from(raw) * AMPLIFIER_UV_PER_BIT
}

#[inline]
pub fn scale_board_analog(raw: u16) -> f64 {
    (f64::from(raw) - BOARD_ANALOG_OFFSET) * BOARD_ANALOG_V_PER_BIT
}

#[inline]
pub fn scale_dc_amplifier(raw: u16) -> f64 {
    (f64::from(raw) - DC_AMPLIFIER_OFFSET) * DC_AMPLIFIER_MV_PER_BIT
}

/// Decodes a stimulation sample from its low byte.
///
/// Magnitude is `(raw & 0xFF) * step`, sign factor is
/// `(128 - (raw & 0xFF)) / 128`. The upper byte is ignored.
#[inline]
pub fn scale_stimulation(raw: u16, step: f64) -> f64 {
    let low = f64::from(raw & 0xFF);
    let magnitude = low * step;
    let sign = (128.0 - low) / 128.0;
    magnitude * sign
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_classify_known_names() {
        assert_eq!(
            DataFileKind::classify("amp-A-000.dat"),
            Some(DataFileKind::Amplifier)
        );
        assert_eq!(
            DataFileKind::classify("board-ANALOG-IN-1.dat"),
            Some(DataFileKind::BoardAnalog)
        );
        assert_eq!(
            DataFileKind::classify("board-ANALOG-OUT-8.dat"),
            Some(DataFileKind::BoardAnalog)
        );
        assert_eq!(
            DataFileKind::classify("dc-B-031.dat"),
            Some(DataFileKind::DcAmplifier)
        );
        assert_eq!(
            DataFileKind::classify("board-DIGITAL-IN-01.dat"),
            Some(DataFileKind::BoardDigital)
        );
        assert_eq!(
            DataFileKind::classify("board-DIGITAL-OUT-16.dat"),
            Some(DataFileKind::BoardDigital)
        );
        assert_eq!(
            DataFileKind::classify("stim-C-005.dat"),
            Some(DataFileKind::Stimulation)
        );
        assert_eq!(DataFileKind::classify("mystery.dat"), None);
        assert_eq!(DataFileKind::classify("time.dat"), None);
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Contains both "amp" and "stim-"
        assert_eq!(
            DataFileKind::classify("stim-amp-A-000.dat"),
            Some(DataFileKind::Amplifier)
        );
        // Contains both "dc-" and "board-DIGITAL-IN"
        assert_eq!(
            DataFileKind::classify("dc-board-DIGITAL-IN-01.dat"),
            Some(DataFileKind::DcAmplifier)
        );
    }

    #[test]
    fn test_board_analog_scale() {
        assert!(approx(scale_board_analog(32768), 0.0));
        assert!(approx(scale_board_analog(0), -10.24));
        assert!(approx(scale_board_analog(65535), 10.2396875));
    }

    #[test]
    fn test_dc_amplifier_scale() {
        assert!(approx(scale_dc_amplifier(512), 0.0));
        assert!(approx(scale_dc_amplifier(513), 19.23));
        assert!(approx(scale_dc_amplifier(0), -512.0 * 19.23));
    }

    #[test]
    fn test_stimulation_decode() {
        let step = 1e-6;
        // Low byte 0: no current
        assert!(approx(scale_stimulation(0x0000, step), 0.0));
        // Low byte 128: sign factor is zero
        assert!(approx(scale_stimulation(0x0080, step), 0.0));
        assert!(approx(scale_stimulation(0x0080, 123.0), 0.0));
        // Low byte 255: sign factor (128 - 255) / 128
        let expected = 255.0 * step * -0.9921875;
        assert!(approx(scale_stimulation(0x00FF, step), expected));
        // Upper byte is ignored
        assert!(approx(
            scale_stimulation(0xFF10, step),
            scale_stimulation(0x0010, step)
        ));
    }

    #[test]
    fn test_scale_amplifier_bytes() {
        let mut bytes = Vec::new();
        for v in [0i16, 100, -100] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let out = DataFileKind::Amplifier.scale(&bytes, 0.0);
        assert_eq!(out.len(), 3);
        assert!(approx(out[0], 0.0));
        assert!(approx(out[1], 19.5));
        assert!(approx(out[2], -19.5));
    }

    #[test]
    fn test_scale_digital_is_raw() {
        let mut bytes = Vec::new();
        for v in [0u16, 1, 0xFFFF] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let out = DataFileKind::BoardDigital.scale(&bytes, 0.0);
        assert_eq!(out, vec![0.0, 1.0, 65535.0]);
    }

    #[test]
    fn test_scale_drops_trailing_partial_sample() {
        let mut bytes = 100i16.to_le_bytes().to_vec();
        bytes.push(0x7F);
        let out = DataFileKind::Amplifier.scale(&bytes, 0.0);
        assert_eq!(out.len(), 1);
        assert!(approx(out[0], 19.5));
    }

    #[test]
    fn test_scale_empty() {
        assert!(DataFileKind::Stimulation.scale(&[], 1.0).is_empty());
    }
}

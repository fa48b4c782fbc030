//! Synthetic RHS header and directory fixtures shared by the integration
//! tests and benchmarks.

#![allow(dead_code)]

use std::path::Path;

pub const MAGIC: u32 = 0xD691_27AC;

#[derive(Debug, Clone)]
pub struct ChannelFixture {
    pub native_name: String,
    pub custom_name: String,
    pub signal_type: i16,
    pub enabled: bool,
    pub chip_channel: i16,
    pub voltage_threshold: i16,
    pub impedance_magnitude: f32,
}

impl ChannelFixture {
    pub fn new(name: &str, signal_type: i16) -> Self {
        Self {
            native_name: name.to_string(),
            custom_name: format!("{}-custom", name),
            signal_type,
            enabled: true,
            chip_channel: 0,
            voltage_threshold: 0,
            impedance_magnitude: 0.0,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn threshold(mut self, threshold: i16) -> Self {
        self.voltage_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GroupFixture {
    pub name: String,
    pub prefix: String,
    /// Raw enabled flag; only positive values mark the group as enabled.
    pub enabled: i16,
    pub channels: Vec<ChannelFixture>,
}

impl GroupFixture {
    pub fn new(name: &str, prefix: &str, channels: Vec<ChannelFixture>) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            enabled: 1,
            channels,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = 0;
        self
    }

    pub fn enabled_flag(mut self, flag: i16) -> Self {
        self.enabled = flag;
        self
    }
}

/// Builder for header bytes in the RHS layout.
#[derive(Debug, Clone)]
pub struct HeaderFixture {
    pub magic: u32,
    pub sample_rate: f32,
    pub notch_mode: i16,
    pub stim_step_size: f32,
    pub notes: [Option<String>; 3],
    pub reference_channel: Option<String>,
    pub groups: Vec<GroupFixture>,
}

impl Default for HeaderFixture {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            sample_rate: 30000.0,
            notch_mode: 2,
            stim_step_size: 1e-6,
            notes: [Some("first".to_string()), None, Some("third".to_string())],
            reference_channel: Some("Hardware".to_string()),
            groups: Vec::new(),
        }
    }
}

pub fn put_qstring(out: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => out.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()),
        Some(s) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            out.extend_from_slice(&((units.len() * 2) as u32).to_le_bytes());
            for u in units {
                out.extend_from_slice(&u.to_le_bytes());
            }
        }
    }
}

fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl HeaderFixture {
    /// One signal group with one enabled amplifier channel.
    pub fn single_amplifier() -> Self {
        Self {
            groups: vec![GroupFixture::new(
                "Port A",
                "A",
                vec![ChannelFixture::new("A-000", 0).threshold(-70)],
            )],
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.magic.to_le_bytes());
        put_i16(&mut out, 1); // major
        put_i16(&mut out, 3); // minor

        put_f32(&mut out, self.sample_rate);
        put_i16(&mut out, 1); // dsp enabled
        for v in [1.0f32, 0.1, 1000.0, 7500.0, 1.0, 0.1, 1000.0, 7500.0] {
            put_f32(&mut out, v);
        }
        put_i16(&mut out, self.notch_mode);
        put_f32(&mut out, 1000.0);
        put_f32(&mut out, 1000.0);
        put_i16(&mut out, 0); // amp settle mode
        put_i16(&mut out, 1); // charge recovery mode

        put_f32(&mut out, self.stim_step_size);
        put_f32(&mut out, 1e-6);
        put_f32(&mut out, 0.0);

        for note in &self.notes {
            put_qstring(&mut out, note.as_deref());
        }
        put_i16(&mut out, 1); // dc amplifier data saved
        put_i16(&mut out, 0); // eval board mode
        put_qstring(&mut out, self.reference_channel.as_deref());

        put_i16(&mut out, self.groups.len() as i16);
        for group in &self.groups {
            put_qstring(&mut out, Some(&group.name));
            put_qstring(&mut out, Some(&group.prefix));
            put_i16(&mut out, group.enabled);
            put_i16(&mut out, group.channels.len() as i16);
            let amps = group.channels.iter().filter(|c| c.signal_type == 0).count();
            put_i16(&mut out, amps as i16);

            // Groups without a positive flag store no channel records
            if group.enabled <= 0 {
                continue;
            }
            for (i, ch) in group.channels.iter().enumerate() {
                put_qstring(&mut out, Some(&ch.native_name));
                put_qstring(&mut out, Some(&ch.custom_name));
                put_i16(&mut out, i as i16); // native order
                put_i16(&mut out, i as i16); // custom order
                put_i16(&mut out, ch.signal_type);
                put_i16(&mut out, ch.enabled as i16);
                put_i16(&mut out, ch.chip_channel);
                put_i16(&mut out, 0); // command stream
                put_i16(&mut out, 0); // board stream
                put_i16(&mut out, 0); // voltage trigger mode
                put_i16(&mut out, ch.voltage_threshold);
                put_i16(&mut out, 0); // digital trigger channel
                put_i16(&mut out, 0); // digital edge polarity
                put_f32(&mut out, ch.impedance_magnitude);
                put_f32(&mut out, 0.0);
            }
        }
        out
    }
}

pub fn write_i16_file(path: &Path, values: &[i16]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}

pub fn write_u16_file(path: &Path, values: &[u16]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}

pub fn write_i32_file(path: &Path, values: &[i32]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
}

/// Writes `info.rhs` and `time.dat` into `dir`.
pub fn write_recording_skeleton(dir: &Path, header: &HeaderFixture, ticks: &[i32]) {
    std::fs::write(dir.join("info.rhs"), header.encode()).unwrap();
    write_i32_file(&dir.join("time.dat"), ticks);
}

//! Python bindings for the RHS recording loader with numpy support.
//!
//! This module exposes header decoding and directory loading through PyO3.
//! Calibrated samples are returned as float64 numpy arrays and the header as
//! nested dictionaries.

use numpy::{IntoPyArray, PyArray1};
use pyo3::exceptions::{PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rhs_core::{Channel, Header, LoadOptions, RecordingLoader, RhsError};
use std::collections::BTreeMap;

fn to_py_err(err: RhsError) -> PyErr {
    match err {
        RhsError::Io { .. } => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Decoded recording directory.
///
/// `timestamps` and each entry of `recordings` are float64 numpy arrays.
#[pyclass]
pub struct Recording {
    header: Header,
    timestamps: Vec<f64>,
    recordings: BTreeMap<String, Vec<f64>>,
}

#[pymethods]
impl Recording {
    /// Returns the number of samples.
    fn __len__(&self) -> usize {
        self.timestamps.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Recording(samples={}, files={}, sample_rate={})",
            self.timestamps.len(),
            self.recordings.len(),
            self.header.frequency_parameters.amplifier_sample_rate
        )
    }

    /// Returns sample times in seconds.
    #[getter]
    fn timestamps<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.timestamps.clone().into_pyarray(py)
    }

    /// Returns a dict mapping data-file stem to calibrated samples.
    #[getter]
    fn recordings(&self, py: Python<'_>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        for (stem, samples) in &self.recordings {
            dict.set_item(stem, samples.clone().into_pyarray(py))?;
        }
        Ok(dict.into())
    }

    /// Returns the decoded header as a dict.
    #[getter]
    fn header(&self, py: Python<'_>) -> PyResult<PyObject> {
        Ok(header_to_dict(py, &self.header)?.into())
    }

    /// Returns the stems of all loaded data files.
    fn keys(&self) -> Vec<String> {
        self.recordings.keys().cloned().collect()
    }

    fn __getitem__<'py>(&self, py: Python<'py>, key: &str) -> PyResult<&'py PyArray1<f64>> {
        self.recordings
            .get(key)
            .map(|samples| samples.clone().into_pyarray(py))
            .ok_or_else(|| PyKeyError::new_err(key.to_string()))
    }
}

fn channel_to_dict<'py>(py: Python<'py>, channel: &Channel) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);
    dict.set_item("native_channel_name", &channel.native_name)?;
    dict.set_item("custom_channel_name", &channel.custom_name)?;
    dict.set_item("port_name", &channel.port_name)?;
    dict.set_item("port_prefix", &channel.port_prefix)?;
    dict.set_item("port_number", channel.port_number)?;
    dict.set_item("native_order", channel.native_order)?;
    dict.set_item("custom_order", channel.custom_order)?;
    dict.set_item("chip_channel", channel.chip_channel)?;
    dict.set_item("board_stream", channel.board_stream)?;
    if let Some(z) = channel.impedance() {
        dict.set_item("electrode_impedance_magnitude", z.magnitude)?;
        dict.set_item("electrode_impedance_phase", z.phase)?;
    }
    Ok(dict)
}

fn channels_to_list<'py>(py: Python<'py>, channels: &[Channel]) -> PyResult<Vec<&'py PyDict>> {
    channels.iter().map(|c| channel_to_dict(py, c)).collect()
}

fn header_to_dict<'py>(py: Python<'py>, header: &Header) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);

    let version = PyDict::new(py);
    version.set_item("major", header.version.major)?;
    version.set_item("minor", header.version.minor)?;
    dict.set_item("version", version)?;
    dict.set_item("sample_rate", header.sample_rate)?;

    let f = &header.frequency_parameters;
    let freq = PyDict::new(py);
    freq.set_item("amplifier_sample_rate", f.amplifier_sample_rate)?;
    freq.set_item("board_adc_sample_rate", f.board_adc_sample_rate)?;
    freq.set_item("board_dig_in_sample_rate", f.board_dig_in_sample_rate)?;
    freq.set_item("dsp_enabled", f.dsp_enabled)?;
    freq.set_item("desired_dsp_cutoff_frequency", f.desired_dsp_cutoff_frequency)?;
    freq.set_item("actual_dsp_cutoff_frequency", f.actual_dsp_cutoff_frequency)?;
    freq.set_item("desired_lower_bandwidth", f.desired_lower_bandwidth)?;
    freq.set_item("actual_lower_bandwidth", f.actual_lower_bandwidth)?;
    freq.set_item("desired_lower_settle_bandwidth", f.desired_lower_settle_bandwidth)?;
    freq.set_item("actual_lower_settle_bandwidth", f.actual_lower_settle_bandwidth)?;
    freq.set_item("desired_upper_bandwidth", f.desired_upper_bandwidth)?;
    freq.set_item("actual_upper_bandwidth", f.actual_upper_bandwidth)?;
    freq.set_item("notch_filter_frequency", f.notch_filter_frequency)?;
    freq.set_item("desired_impedance_test_frequency", f.desired_impedance_test_frequency)?;
    freq.set_item("actual_impedance_test_frequency", f.actual_impedance_test_frequency)?;
    dict.set_item("frequency_parameters", freq)?;

    dict.set_item("stim_step_size", header.stim.stim_step_size)?;
    dict.set_item("recovery_current_limit", header.stim.charge_recovery_current_limit)?;
    dict.set_item("recovery_target_voltage", header.stim.charge_recovery_target_voltage)?;
    dict.set_item("amp_settle_mode", header.stim.amp_settle_mode)?;
    dict.set_item("charge_recovery_mode", header.stim.charge_recovery_mode)?;

    let notes = PyDict::new(py);
    notes.set_item("note1", &header.notes.note1)?;
    notes.set_item("note2", &header.notes.note2)?;
    notes.set_item("note3", &header.notes.note3)?;
    dict.set_item("notes", notes)?;

    dict.set_item("dc_amplifier_data_saved", header.dc_amplifier_data_saved)?;
    dict.set_item("eval_board_mode", header.eval_board_mode)?;
    dict.set_item("ref_channel_name", &header.reference_channel)?;

    let catalog = &header.channels;
    dict.set_item(
        "amplifier_channels",
        channels_to_list(py, catalog.amplifier_channels())?,
    )?;
    dict.set_item(
        "board_adc_channels",
        channels_to_list(py, catalog.board_adc_channels())?,
    )?;
    dict.set_item(
        "board_dac_channels",
        channels_to_list(py, catalog.board_dac_channels())?,
    )?;
    dict.set_item(
        "board_dig_in_channels",
        channels_to_list(py, catalog.board_dig_in_channels())?,
    )?;
    dict.set_item(
        "board_dig_out_channels",
        channels_to_list(py, catalog.board_dig_out_channels())?,
    )?;

    let mut triggers = Vec::with_capacity(catalog.num_amplifier_channels());
    for t in catalog.spike_triggers() {
        let trigger = PyDict::new(py);
        trigger.set_item("voltage_trigger_mode", t.voltage_trigger_mode)?;
        trigger.set_item("voltage_threshold", t.voltage_threshold)?;
        trigger.set_item("digital_trigger_channel", t.digital_trigger_channel)?;
        trigger.set_item("digital_edge_polarity", t.digital_edge_polarity)?;
        triggers.push(trigger);
    }
    dict.set_item("spike_triggers", triggers)?;

    dict.set_item("num_amplifier_channels", catalog.num_amplifier_channels())?;
    dict.set_item("num_board_adc_channels", catalog.num_board_adc_channels())?;
    dict.set_item("num_board_dac_channels", catalog.num_board_dac_channels())?;
    dict.set_item("num_board_dig_in_channels", catalog.num_board_dig_in_channels())?;
    dict.set_item("num_board_dig_out_channels", catalog.num_board_dig_out_channels())?;

    Ok(dict)
}

/// Decodes an RHS header file.
///
/// Args:
///     path: Path to the header file (e.g. info.rhs)
///
/// Returns:
///     dict: Header fields, channel lists and channel counts
#[pyfunction]
fn read_header(py: Python<'_>, path: &str) -> PyResult<PyObject> {
    let header = Header::read_file(path).map_err(to_py_err)?;
    Ok(header_to_dict(py, &header)?.into())
}

/// Loads a one-file-per-channel recording directory.
///
/// Args:
///     folder: Directory containing info.rhs, time.dat and the data files
///     file_expr: Glob selecting which data files to load (default: "*.dat")
///
/// Returns:
///     Recording: Header, timestamps in seconds, and calibrated samples
///
/// Example:
///     >>> import rhs
///     >>> rec = rhs.load_rhs("/data/session_01", file_expr="amp*.dat")
///     >>> t = rec.timestamps
///     >>> v = rec["amp-B-000"]  # microvolts
#[pyfunction]
#[pyo3(signature = (folder, file_expr="*.dat"))]
fn load_rhs(py: Python<'_>, folder: &str, file_expr: &str) -> PyResult<Py<Recording>> {
    let loader = RecordingLoader::new(LoadOptions::default().with_pattern(file_expr));
    let recording = py
        .allow_threads(|| loader.load(folder))
        .map_err(to_py_err)?;

    Py::new(
        py,
        Recording {
            header: recording.header,
            timestamps: recording.timestamps,
            recordings: recording.recordings,
        },
    )
}

/// RHS recording loader module for Python.
#[pymodule]
fn _rhs(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(read_header, m)?)?;
    m.add_function(wrap_pyfunction!(load_rhs, m)?)?;
    m.add_class::<Recording>()?;
    Ok(())
}

//! RHS recording CLI application.
//!
//! Inspects RHS headers and loads one-file-per-channel recording directories.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rhs_core::{Channel, DataFileKind, Header, LoadObserver, LoadOptions, RecordingLoader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// RHS2000 recording inspector and loader.
///
/// Decodes the binary header and calibrates per-channel data files.
#[derive(Parser, Debug)]
#[command(name = "rhs")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the decoded header and channel catalog
    Header {
        /// Header file (e.g. info.rhs)
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Load a recording directory and summarise every data file
    Load {
        /// Directory containing the header, time.dat and data files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Glob selecting the data files to load
        #[arg(short, long, default_value = "*.dat")]
        pattern: String,

        /// Glob locating the header file
        #[arg(long, default_value = "*.rhs")]
        header_pattern: String,

        /// Glob locating the timestamp file
        #[arg(long, default_value = "time.dat")]
        timestamp_pattern: String,

        /// Scale data files in parallel (needs the `parallel` feature of rhs-core)
        #[arg(long)]
        parallel: bool,
    },
}

/// Drives a progress bar from loader callbacks.
struct ProgressObserver {
    bar: ProgressBar,
}

impl LoadObserver for ProgressObserver {
    fn header_decoded(&self, header: &Header) {
        self.bar.set_message(format!(
            "Header v{}.{}, {} channels",
            header.version.major,
            header.version.minor,
            header.channels.counts().total()
        ));
    }

    fn data_files_found(&self, count: usize) {
        self.bar.set_length(count as u64);
    }

    fn data_file_loaded(&self, stem: &str, _samples: usize) {
        self.bar.set_message(stem.to_string());
        self.bar.inc(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!(?args, "Parsed arguments");

    match args.command {
        Command::Header { path } => {
            let header = Header::read_file(&path)
                .with_context(|| format!("Failed to decode header {:?}", path))?;
            print_header(&header);
        }
        Command::Load {
            dir,
            pattern,
            header_pattern,
            timestamp_pattern,
            parallel,
        } => {
            let options = LoadOptions::default()
                .with_pattern(pattern)
                .with_header_pattern(header_pattern)
                .with_timestamp_pattern(timestamp_pattern)
                .with_parallel(parallel);
            load(&dir, options, args.quiet)?;
        }
    }

    Ok(())
}

fn load(dir: &Path, options: LoadOptions, quiet: bool) -> Result<()> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30}] {pos}/{len} {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };
    let observer = ProgressObserver { bar };

    let start_time = Instant::now();
    let recording = RecordingLoader::new(options)
        .load_with_observer(dir, &observer)
        .with_context(|| format!("Failed to load recording {:?}", dir))?;
    let duration = start_time.elapsed();

    observer.bar.finish_with_message(format!(
        "Loaded {} files in {:.2}s",
        recording.recordings.len(),
        duration.as_secs_f64()
    ));

    let span = match (recording.timestamps.first(), recording.timestamps.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };

    println!("Directory:   {:?}", dir);
    println!(
        "Sample rate: {} Hz",
        recording.header.frequency_parameters.amplifier_sample_rate
    );
    println!(
        "Samples:     {} ({:.3} s)",
        recording.timestamps.len(),
        span
    );
    println!();
    println!(
        "{:<28} {:>10} {:>14} {:>14}  unit",
        "file", "samples", "min", "max"
    );
    for (stem, samples) in &recording.recordings {
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let unit = DataFileKind::classify(stem)
            .map(|k| k.unit())
            .unwrap_or("?");
        println!(
            "{:<28} {:>10} {:>14.4} {:>14.4}  {}",
            stem,
            samples.len(),
            min,
            max,
            unit
        );
    }

    Ok(())
}

fn print_header(header: &Header) {
    let freq = &header.frequency_parameters;
    println!(
        "RHS2000 header v{}.{}",
        header.version.major, header.version.minor
    );
    println!("  Sample rate:        {} Hz", freq.amplifier_sample_rate);
    println!("  DSP enabled:        {}", freq.dsp_enabled != 0);
    println!(
        "  Bandwidth:          {} Hz - {} Hz (DSP cutoff {} Hz)",
        freq.actual_lower_bandwidth,
        freq.actual_upper_bandwidth,
        freq.actual_dsp_cutoff_frequency
    );
    println!("  Notch filter:       {} Hz", freq.notch_filter_frequency);
    println!(
        "  Impedance test:     {} Hz",
        freq.actual_impedance_test_frequency
    );
    println!("  Stim step size:     {} A", header.stim.stim_step_size);
    println!(
        "  Charge recovery:    {} A limit, {} V target",
        header.stim.charge_recovery_current_limit,
        header.stim.charge_recovery_target_voltage
    );
    println!("  DC amplifier saved: {}", header.dc_amplifier_data_saved);
    println!("  Reference channel:  {}", header.reference_channel);
    for note in [&header.notes.note1, &header.notes.note2, &header.notes.note3] {
        if !note.is_empty() {
            println!("  Note:               {}", note);
        }
    }

    let catalog = &header.channels;
    let counts = catalog.counts();
    println!();
    println!("Channels ({} total):", counts.total());
    print_channels("Amplifier", catalog.amplifier_channels());
    print_channels("Board ADC", catalog.board_adc_channels());
    print_channels("Board DAC", catalog.board_dac_channels());
    print_channels("Digital in", catalog.board_dig_in_channels());
    print_channels("Digital out", catalog.board_dig_out_channels());
}

fn print_channels(label: &str, channels: &[Channel]) {
    if channels.is_empty() {
        return;
    }
    println!("  {} ({}):", label, channels.len());
    for channel in channels {
        match channel.impedance() {
            Some(z) => println!(
                "    {:<16} {:<20} port {} ({})  |Z| {:.0} Ohm",
                channel.native_name,
                channel.custom_name,
                channel.port_number,
                channel.port_prefix,
                z.magnitude
            ),
            None => println!(
                "    {:<16} {:<20} port {} ({})",
                channel.native_name,
                channel.custom_name,
                channel.port_number,
                channel.port_prefix
            ),
        }
    }
}

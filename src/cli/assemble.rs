
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{AFTER_HELP, FULL_VERSION};
use crate::data_types::kmer::MAX_K;

#[derive(Args, Clone, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct AssembleSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    quokka_version: String,

    /// Optional output path for the JSON stats report
    #[clap(short = 'o')]
    #[clap(long = "output-stats")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub stats_filename: Option<PathBuf>,

    /// Number of independent assembly windows to simulate
    #[clap(short = 'w')]
    #[clap(long = "windows")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "8")]
    pub window_count: u64,

    /// Reference bases per window
    #[clap(long = "window-size")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "2000")]
    pub window_size: usize,

    /// Length of each simulated read
    #[clap(long = "read-length")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "150")]
    pub read_length: usize,

    /// Mean simulated read depth per window
    #[clap(long = "coverage")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "30")]
    pub coverage: u32,

    /// Positional ambiguity applied to read k-mers, in bases each side
    #[clap(long = "jitter")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "2")]
    pub jitter: i64,

    /// Per-base substitution error probability applied to reads
    #[clap(long = "error-rate")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "0.001")]
    pub error_rate: f64,

    /// Base seed for the simulation RNG
    #[clap(long = "seed")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Simulation"))]
    #[clap(default_value = "42")]
    pub seed: u64,

    /// K-mer size for graph construction
    #[clap(short = 'k')]
    #[clap(long = "kmer-size")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Assembly parameters"))]
    #[clap(default_value = "21")]
    pub kmer_size: usize,

    /// Contigs with fewer k-mers than this are not reported
    #[clap(long = "min-contig-kmers")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Assembly parameters"))]
    #[clap(default_value = "10")]
    pub min_contig_kmers: usize,

    /// Number of threads to use for assembly
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: u32,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Validates the assemble settings and logs the run parameters.
/// # Arguments
/// * `settings` - the raw settings from the command line
/// # Errors
/// * if any parameter combination cannot produce a valid simulation
pub fn check_assemble_settings(mut settings: AssembleSettings) -> anyhow::Result<AssembleSettings> {
    settings.quokka_version = FULL_VERSION.clone();
    info!("Quokka version: {}", settings.quokka_version);

    if settings.kmer_size == 0 || settings.kmer_size > MAX_K {
        bail!("--kmer-size must be in [1, {MAX_K}]");
    }
    if settings.read_length <= settings.kmer_size {
        bail!("--read-length must be greater than --kmer-size");
    }
    if settings.window_size < settings.read_length {
        bail!("--window-size must be at least --read-length");
    }
    if settings.window_count == 0 {
        bail!("--windows must be at least 1");
    }
    if settings.coverage == 0 {
        bail!("--coverage must be at least 1");
    }
    if settings.jitter < 0 {
        bail!("--jitter must be non-negative");
    }
    if !(0.0..1.0).contains(&settings.error_rate) {
        bail!("--error-rate must be in [0.0, 1.0)");
    }

    info!("Simulation: {} windows x {} bp, {} bp reads at {}x, jitter {}, error rate {}",
        settings.window_count, settings.window_size, settings.read_length,
        settings.coverage, settings.jitter, settings.error_rate);
    info!("Assembly: k={}, min contig k-mers={}", settings.kmer_size, settings.min_contig_kmers);
    if let Some(stats_filename) = settings.stats_filename.as_ref() {
        info!("Stats output: {stats_filename:?}");
    }

    Ok(settings)
}


use indicatif::ParallelProgressIterator;
use log::{error, info, LevelFilter};
use rayon::prelude::*;
use std::time::Instant;

use quokka::assembler::{Assembler, AssemblerConfigBuilder};
use quokka::cli::assemble::{check_assemble_settings, AssembleSettings};
use quokka::cli::core::{get_cli, Commands};
use quokka::data_types::assembly_stats::{AssemblyStats, WindowSummary};
use quokka::read_simulator::{simulate_window, SimulationSettings};
use quokka::util::json_io::save_json;
use quokka::util::progress_bar::get_progress_style;

fn run_assemble(settings: AssembleSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_assemble_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads as usize).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    let assembler_config = match AssemblerConfigBuilder::default()
        .k(settings.kmer_size)
        .min_contig_kmers(settings.min_contig_kmers)
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building assembler config: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let assembler = match Assembler::new(assembler_config) {
        Ok(a) => a,
        Err(e) => {
            error!("Error while creating assembler: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let simulation_settings = SimulationSettings {
        k: settings.kmer_size,
        window_size: settings.window_size,
        read_length: settings.read_length,
        coverage: settings.coverage,
        jitter: settings.jitter,
        error_rate: settings.error_rate,
    };

    // each window is a fully independent unit of work with its own graph
    info!("Assembling {} simulated windows...", settings.window_count);
    let style = get_progress_style();
    let window_summaries: Vec<WindowSummary> = (0..settings.window_count as usize).into_par_iter()
        .progress_with_style(style)
        .map(|window_index| {
            let window_index = window_index as u64;
            let window = simulate_window(&simulation_settings, settings.seed, window_index);

            // measure the simplified graph, then let assembly consume it
            let mut graph = assembler.build_window_graph(&window.evidence);
            let graph_nodes = graph.live_node_count();
            let graph_edges = graph.live_edge_count();

            let contigs = assembler.assemble_graph(&mut graph);
            WindowSummary {
                window_index,
                evidence_kmers: window.evidence.len(),
                graph_nodes,
                graph_edges,
                contigs: contigs.len(),
                contig_bases: contigs.iter().map(|c| c.sequence().len()).sum(),
                consumed_weight: contigs.iter().map(|c| c.total_weight() as u64).sum(),
            }
        })
        .collect();

    let stats = AssemblyStats::from_summaries(window_summaries);
    info!("Assembled {} contigs ({} bases) across {} windows, {:.2} contigs/window",
        stats.total_contigs, stats.total_contig_bases, stats.windows, stats.mean_contigs_per_window);

    if let Some(stats_filename) = settings.stats_filename.as_ref() {
        info!("Saving stats to {stats_filename:?}...");
        if let Err(e) = save_json(&stats, stats_filename) {
            error!("Error while saving stats: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Total runtime: {:.2?}", start_time.elapsed());
    info!("Assembly successful, exiting.");
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Assemble(settings) => {
            run_assemble(*settings);
        }
    };
}

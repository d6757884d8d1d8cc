
use serde::Serialize;

/// Assembly results for one window, suitable for the JSON stats report
#[derive(Clone, Debug, Serialize)]
pub struct WindowSummary {
    /// index of the window in the run
    pub window_index: u64,
    /// evidence k-mers fed into graph construction
    pub evidence_kmers: usize,
    /// graph nodes after simplification
    pub graph_nodes: usize,
    /// graph edges after simplification
    pub graph_edges: usize,
    /// contigs reported for the window
    pub contigs: usize,
    /// total assembled bases across the window's contigs
    pub contig_bases: usize,
    /// total supporting weight consumed by the window's contigs
    pub consumed_weight: u64,
}

/// Aggregate assembly statistics across all windows
#[derive(Clone, Debug, Serialize)]
pub struct AssemblyStats {
    pub windows: usize,
    pub total_contigs: usize,
    pub total_contig_bases: usize,
    pub total_consumed_weight: u64,
    pub mean_contigs_per_window: f64,
    pub window_summaries: Vec<WindowSummary>,
}

impl AssemblyStats {
    /// Rolls per-window summaries up into the aggregate report.
    pub fn from_summaries(window_summaries: Vec<WindowSummary>) -> Self {
        let windows = window_summaries.len();
        let total_contigs: usize = window_summaries.iter().map(|w| w.contigs).sum();
        let total_contig_bases: usize = window_summaries.iter().map(|w| w.contig_bases).sum();
        let total_consumed_weight: u64 = window_summaries.iter().map(|w| w.consumed_weight).sum();
        let mean_contigs_per_window = if windows == 0 {
            0.0
        } else {
            total_contigs as f64 / windows as f64
        };
        AssemblyStats {
            windows,
            total_contigs,
            total_contig_bases,
            total_consumed_weight,
            mean_contigs_per_window,
            window_summaries,
        }
    }
}

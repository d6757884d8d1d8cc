
/// Closed-interval overlap arithmetic shared by the graph invariants
pub mod intervals;
/// Helper functions for writing JSON via serde
pub mod json_io;
/// Helper functions for generating the progress bars
pub mod progress_bar;


/// Settings for the assemble stress driver
pub mod assemble;
/// Contains the core CLI wrapper for the subcommands
pub mod core;

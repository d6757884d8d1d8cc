use chrono::Datelike;
use clap::{Parser, Subcommand};
use lazy_static::lazy_static;

use crate::cli::assemble::AssembleSettings;

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-8cc41b2-dirty` - while on a dirty branch
    /// * `0.3.1-8cc41b2` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string containing the legalese.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2023-{}     Pacific Biosciences of California, Inc.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// Quokka, a tool for piecing together structural vari-Ant evidence.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Assembles simulated evidence windows as a stress/benchmark driver
    Assemble(Box<AssembleSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

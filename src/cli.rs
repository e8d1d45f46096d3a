//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tuffysearch", about = "CSUF course catalog scraper and indexer")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape the catalog and write the course artifact.
    Scrape {
        /// Artifact path (defaults to CATALOG_PATH, then data/catalog.json).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load a course artifact into the relational store.
    LoadDb {
        /// Artifact path to load.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Embed courses and upsert them into the vector index.
    Index {
        /// Artifact path to index.
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

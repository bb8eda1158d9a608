//! Command-line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tweak_common::{Category, Risk};

#[derive(Parser, Debug)]
#[command(name = "tweakctl")]
#[command(about = "Tweakwise - inspect and change Windows optimization tweaks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List tweaks with their live state
    List {
        /// Only this category (system, network, privacy, gaming)
        #[arg(long)]
        category: Option<Category>,

        /// Only this risk level (low, medium, high)
        #[arg(long)]
        risk: Option<Risk>,

        /// Only tweaks not present on this system
        #[arg(long)]
        unavailable: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show one tweak in detail
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the optimization score
    Score {
        /// Break the score down per category
        #[arg(long)]
        by_category: bool,

        #[arg(long)]
        json: bool,
    },

    /// Apply a tweak
    Apply {
        id: String,

        /// Show what would be done without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert a tweak to its Windows default
    Revert {
        id: String,

        /// Show what would be done without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-probe everything and print a summary
    Refresh,

    /// Print the built-in catalog without probing
    Catalog,
}

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "An adaptive news-reader client", long_about = None)]
pub struct Cli {
    /// Print a metrics snapshot after the command completes
    #[arg(long, global = true)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the latest news
    Latest {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show the featured stories
    Featured,
    /// Show news for a category
    Category {
        /// Category id (see `categories`)
        id: u64,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Search posts
    Search {
        /// Search term, three characters minimum
        query: String,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// List the known categories
    Categories,
    /// Run the background prefetcher in the foreground until Ctrl-C
    Daemon,
}

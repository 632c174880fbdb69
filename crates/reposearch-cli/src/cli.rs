use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "reposearch", version, about = "Search GitHub repositories from the terminal")]
pub struct Cli {
    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search repositories by name, description or topic
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Restrict results to an organization; remembered for later searches, "" clears it
        #[arg(long)]
        org: Option<String>,

        /// Print the raw response envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Authenticate with a personal access token for a higher rate limit
    Login,

    /// Forget the stored token
    Logout,

    /// Show whether a token is stored
    Status,

    /// Answer JSON messages on stdin, one per line, for other front ends
    Serve,
}

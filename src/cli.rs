use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding config.yaml and downloaded models.
    /// Defaults to $TIPFINDER_BASE_PATH or ~/.local/share/tipfinder
    #[clap(long, global = true)]
    pub base_path: Option<PathBuf>,

    /// Use this corpus file instead of the configured one
    #[clap(long, global = true)]
    pub corpus: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find the tips most relevant to a question
    Query {
        /// Free-text question, e.g. "how do I get clean water"
        text: String,

        /// Number of tips to return
        #[clap(short = 'n', long)]
        top_n: Option<usize>,

        /// Print similarity scores next to each tip
        #[clap(long, default_value = "false")]
        scores: bool,
    },

    /// Print every tip in the corpus with its id
    List,

    /// Parse the corpus and report problems, without loading a model
    Check,
}

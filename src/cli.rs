use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trigrams",
    about = "Compressed trigram statistics: build, inspect, and query store files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress a tab-separated trigram corpus into a store file
    Compress {
        /// Input .tsv file: w0 <TAB> w1 <TAB> w2 <TAB> count
        #[arg(short, long)]
        input: String,

        /// Output store file
        #[arg(short, long)]
        output: String,

        /// Explicitly add (w1, w2) for every (w0, w1, w2); needed when
        /// the corpus was not generated with a sliding window
        #[arg(long)]
        add_all_bigrams: bool,
    },

    /// Inspect a store file's header and sections
    Inspect {
        /// Path to the store file
        file: String,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query frequency and probability of an n-gram (1-3 words)
    Query {
        /// Path to the store file
        file: String,

        /// The words of the n-gram; use '' for the sentence sentinel
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// List the most probable successors of a 1-2 word prefix
    Succ {
        /// Path to the store file
        file: String,

        /// Maximum number of successors to list
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// The prefix words
        #[arg(required = true)]
        words: Vec<String>,
    },
}

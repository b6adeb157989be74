use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "ragstore",
    about = "A minimal local vector store and similarity-search CLI"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upsert a document and replace its chunks from a JSON file
    Add(AddArgs),
    /// Search chunks by embedding similarity
    Search(SearchArgs),
    /// List stored documents by insertion time
    List(ListArgs),
    /// Show store status and statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Add --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Document id (externally assigned)
    pub doc_id: String,

    /// Path to a JSON array of {"text", "embedding"} objects ("-" for stdin)
    pub chunks: PathBuf,

    /// Document title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Document metadata as a JSON object
    #[arg(long)]
    pub meta: Option<String>,

    /// Metadata attached to every chunk, as a JSON object
    #[arg(long)]
    pub chunk_meta: Option<String>,

    /// Fail on mismatched text/embedding counts instead of truncating
    #[arg(long)]
    pub strict: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Path to a JSON array of floats: the query embedding ("-" for stdin)
    pub embedding: PathBuf,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Restrict results to these document ids (can be repeated)
    #[arg(short = 'd', long = "doc")]
    pub doc_ids: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- List --

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "ragstore",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["ragstore", "search", "query.json"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.embedding, PathBuf::from("query.json"));
                assert_eq!(args.count, 5);
                assert!(args.doc_ids.is_empty());
                assert!(!args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_add_with_filters() {
        let cli = Cli::parse_from([
            "ragstore", "add", "docA", "chunks.json", "--title", "Doc A",
            "--strict",
        ]);
        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.doc_id, "docA");
                assert_eq!(args.title, "Doc A");
                assert!(args.strict);
                assert!(args.meta.is_none());
            }
            _ => panic!("expected add command"),
        }
    }
}

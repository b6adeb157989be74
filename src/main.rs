use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod chunk_id;
pub mod cli;
pub mod data_dir;
pub mod error;
pub mod search;
pub mod store;

use cli::{AddArgs, Cli, Command, ListArgs, SearchArgs, StatusArgs};
use data_dir::DataDir;
use serde::Deserialize;
use store::{LengthPolicy, Metadata, Store};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RAGSTORE_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = Store::open(&data_dir.store_db())?;

    match cli.command {
        Command::Add(args) => cmd_add(store, &args)?,
        Command::Search(args) => cmd_search(&store, &args)?,
        Command::List(args) => cmd_list(&store, &args)?,
        Command::Status(args) => cmd_status(&store, &data_dir, &args)?,
        Command::Completions(_) => unreachable!("handled above"),
    }

    Ok(())
}

/// One entry of the chunk input file.
#[derive(Debug, Deserialize)]
struct ChunkInput {
    text: String,
    #[serde(default)]
    embedding: Vec<f32>,
}

fn cmd_add(store: Store, args: &AddArgs) -> error::Result<()> {
    let store = if args.strict {
        store.with_length_policy(LengthPolicy::Reject)
    } else {
        store
    };

    let doc_meta = parse_meta(args.meta.as_deref())?.unwrap_or_default();
    let chunk_meta = parse_meta(args.chunk_meta.as_deref())?;

    let raw = read_input(&args.chunks)?;
    let inputs: Vec<ChunkInput> = serde_json::from_str(&raw)?;
    let (texts, embeddings): (Vec<String>, Vec<Vec<f32>>) = inputs
        .into_iter()
        .map(|c| (c.text, c.embedding))
        .unzip();

    store.upsert_document(&args.doc_id, &args.title, doc_meta)?;
    let inserted = store.replace_chunks(
        &args.doc_id,
        &texts,
        &embeddings,
        chunk_meta.as_ref(),
    )?;

    println!("{}: {inserted} chunk(s) stored", args.doc_id);
    Ok(())
}

fn cmd_search(store: &Store, args: &SearchArgs) -> error::Result<()> {
    let raw = read_input(&args.embedding)?;
    let query: Vec<f32> = serde_json::from_str(&raw)?;

    let filter = if args.doc_ids.is_empty() {
        None
    } else {
        Some(args.doc_ids.as_slice())
    };

    let results = search::search(store, &query, args.count, filter)?;

    if args.json {
        search::format_json(&results)?;
    } else {
        search::format_human(&results);
    }
    Ok(())
}

fn cmd_list(store: &Store, args: &ListArgs) -> error::Result<()> {
    let documents = store.list_documents()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &documents {
        println!("{:>13}  {}  {}", doc.added_at, doc.id, doc.title);
    }
    Ok(())
}

fn cmd_status(
    store: &Store,
    data_dir: &DataDir,
    args: &StatusArgs,
) -> error::Result<()> {
    let documents = store.count_documents()?;
    let chunks = store.count_chunks()?;

    if args.json {
        let doc = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "documents": documents,
            "chunks": chunks,
            "max_candidates": search::MAX_CANDIDATES,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Data directory: {}", data_dir.root().display());
    println!("Documents:      {documents}");
    println!("Chunks:         {chunks}");
    println!("Candidate cap:  {}", search::MAX_CANDIDATES);
    Ok(())
}

/// Read a JSON input file, with "-" meaning stdin.
fn read_input(path: &std::path::Path) -> error::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn parse_meta(raw: Option<&str>) -> error::Result<Option<Metadata>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(error::Error::Config(format!(
            "metadata must be a JSON object, got: {other}"
        ))),
    }
}

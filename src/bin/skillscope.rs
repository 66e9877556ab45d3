//! Skillscope CLI
//!
//! Chunk documents, search them, or run a full skill-gap diagnosis.
//! Results go to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use skillscope_lib::{
    build_pipeline, chunk_text, diagnosis_prompt, diagnosis_query, embedder_from_config, format_context,
    load_document, parse_diagnosis, CachedEmbedder, ChatModel, CompanyProfile, DiagnosisReport, Document,
    GroqClient, SkillscopeConfig,
};

#[derive(Parser)]
#[command(name = "skillscope")]
#[command(about = "Skillscope CLI - Retrieval-augmented skill-gap diagnosis", long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/skillscope/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Chunk window overrides
#[derive(Args)]
struct WindowArgs {
    /// Characters per chunk
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Characters shared by consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a text file into overlapping chunks
    Chunk {
        /// Plain-text file (.txt or .md)
        file: PathBuf,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Rank document passages against a query
    Search {
        /// Search query
        query: String,
        /// Document to index (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,
        /// Number of passages to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Retrieve context, ask the model and print the diagnosis report
    Diagnose {
        /// Document to index (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,
        /// Company profile JSON file
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Identifier recorded in the report
        #[arg(long, default_value = "C001")]
        company_id: String,
        /// Number of passages sent as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Also write the report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        window: WindowArgs,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput {
    filename: String,
    chunk_size: usize,
    overlap: usize,
    count: usize,
    chunks: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PassageOutput {
    rank: usize,
    score: f32,
    source: String,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchOutput {
    query: String,
    documents: usize,
    chunks: usize,
    results: Vec<PassageOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "skillscope=debug,skillscope_lib=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Chunk { file, window } => handle_chunk(config, &file, window),
            Commands::Search { query, docs, top_k, window } => handle_search(config, query, &docs, top_k, window),
            Commands::Diagnose { docs, profile, company_id, top_k, output, window } => {
                handle_diagnose(config, &docs, profile.as_deref(), company_id, top_k, output.as_deref(), window)
                    .await
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput { error: format!("{:#}", e) };
            println!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| r#"{"error":"unknown error"}"#.to_string())
            );
            std::process::exit(1);
        }
    }
}

// ============ Helpers ============

fn load_config(path: Option<&Path>) -> anyhow::Result<SkillscopeConfig> {
    let config = match path {
        Some(p) => SkillscopeConfig::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => SkillscopeConfig::load_default().context("loading default config")?,
    };
    debug!(top_k = config.rag.top_k, model = %config.llm.model, "Config resolved");
    Ok(config)
}

/// Apply flag overrides on top of the file values, then re-validate
fn apply_overrides(
    mut config: SkillscopeConfig,
    window: &WindowArgs,
    top_k: Option<usize>,
) -> anyhow::Result<SkillscopeConfig> {
    if let Some(size) = window.chunk_size {
        config.rag.chunk_size = size;
    }
    if let Some(overlap) = window.overlap {
        config.rag.overlap = overlap;
    }
    if let Some(k) = top_k {
        config.rag.top_k = k;
    }
    config.validate()?;
    Ok(config)
}

fn load_documents(paths: &[PathBuf]) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let document = load_document(path).with_context(|| format!("reading {}", path.display()))?;
        if document.is_blank() {
            warn!(filename = %document.filename, "Document has no text");
        }
        documents.push(document);
    }
    Ok(documents)
}

// ============ Handlers ============

fn handle_chunk(config: SkillscopeConfig, file: &Path, window: WindowArgs) -> anyhow::Result<String> {
    let config = apply_overrides(config, &window, None)?;
    let document = load_document(file).with_context(|| format!("reading {}", file.display()))?;
    let chunks = chunk_text(&document.text, config.rag.chunk_size, config.rag.overlap)?;

    let output = ChunkOutput {
        filename: document.filename,
        chunk_size: config.rag.chunk_size,
        overlap: config.rag.overlap,
        count: chunks.len(),
        chunks,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn handle_search(
    config: SkillscopeConfig,
    query: String,
    paths: &[PathBuf],
    top_k: Option<usize>,
    window: WindowArgs,
) -> anyhow::Result<String> {
    let config = apply_overrides(config, &window, top_k)?;
    let rag = &config.rag;
    let documents = load_documents(paths)?;

    let embedder = embedder_from_config(&rag.embedding_model, rag.embedding_dim)?;
    let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
    let session = build_pipeline(&texts, rag.chunk_size, rag.overlap, embedder)?;
    let passages = session.search(&query, rag.top_k)?;

    let results = passages
        .into_iter()
        .enumerate()
        .map(|(i, p)| PassageOutput {
            rank: i + 1,
            score: p.score,
            source: documents
                .get(p.document)
                .map(|d| d.filename.clone())
                .unwrap_or_default(),
            text: p.text,
        })
        .collect();

    let stats = session.stats();
    let output = SearchOutput {
        query,
        documents: stats.documents,
        chunks: stats.chunks,
        results,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

async fn handle_diagnose(
    config: SkillscopeConfig,
    paths: &[PathBuf],
    profile: Option<&Path>,
    company_id: String,
    top_k: Option<usize>,
    output: Option<&Path>,
    window: WindowArgs,
) -> anyhow::Result<String> {
    let config = apply_overrides(config, &window, top_k)?;
    let rag = &config.rag;

    // Fail on a missing key before doing any indexing work
    let client = GroqClient::from_env(&config.llm)?;

    let profile = profile
        .map(|p| CompanyProfile::load(p).with_context(|| format!("reading profile {}", p.display())))
        .transpose()?;
    let documents = load_documents(paths)?;

    let embedder = CachedEmbedder::new(embedder_from_config(&rag.embedding_model, rag.embedding_dim)?);
    let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
    let session = build_pipeline(&texts, rag.chunk_size, rag.overlap, embedder)?;

    let query = diagnosis_query(profile.as_ref());
    let context = session.retrieve(&query, rag.top_k)?;
    let prompt = diagnosis_prompt(&format_context(&context));
    info!(passages = context.len(), model = client.model(), "Requesting diagnosis");

    let answer = client.complete(&prompt).await?;
    let diagnosis = parse_diagnosis(&answer)?;

    let report = DiagnosisReport::new(
        company_id,
        rag.top_k,
        documents.iter().map(Document::meta).collect(),
        context,
        diagnosis,
    );
    if let Some(path) = output {
        report.save(path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), run_id = %report.run_id, "Saved report");
    }

    Ok(serde_json::to_string_pretty(&report)?)
}

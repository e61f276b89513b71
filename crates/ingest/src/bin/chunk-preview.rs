//! chunk-preview — run the chunker over a local text file and print what the
//! index would see. Useful for tuning CHUNK_SIZE / CHUNK_OVERLAP.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use skimmer_core::chunk::{ParsedDocument, ParsedPage};
use skimmer_core::config::{load_dotenv, ChunkConfig, Config};
use skimmer_ingest::Chunker;

/// Preview how a text/markdown file is chunked for indexing.
#[derive(Parser, Debug)]
#[command(name = "chunk-preview", version, about)]
struct Cli {
    /// File to chunk (read as UTF-8 text; form feeds split pages).
    file: PathBuf,

    /// Maximum tokens per chunk (defaults to CHUNK_SIZE).
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap tokens between chunks (defaults to CHUNK_OVERLAP).
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Print full chunk contents instead of a preview line.
    #[arg(long)]
    full: bool,
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let defaults = Config::from_env().chunking;
    let config = ChunkConfig {
        chunk_size: cli.chunk_size.unwrap_or(defaults.chunk_size),
        chunk_overlap: cli.chunk_overlap.unwrap_or(defaults.chunk_overlap),
    };

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "stdin".to_string());

    let doc = ParsedDocument {
        filename,
        pages: text
            .split('\u{c}')
            .enumerate()
            .map(|(i, page)| ParsedPage {
                page_number: i as u32 + 1,
                content: page.to_string(),
                section_title: None,
            })
            .collect(),
    };

    info!(
        "chunking {} ({} pages, {} chars) with size={} overlap={}",
        doc.filename,
        doc.pages.len(),
        doc.total_chars(),
        config.chunk_size,
        config.chunk_overlap
    );

    let chunks = Chunker::new(&config).chunk_document(&doc);

    for chunk in &chunks {
        let preview = if cli.full {
            chunk.content.clone()
        } else {
            chunk.content.chars().take(72).collect::<String>()
        };
        println!(
            "#{:<4} p{:<3} {:>4} tok  {}  {}",
            chunk.chunk_index,
            chunk.page_number.unwrap_or(0),
            chunk.token_count,
            &chunk.content_hash[..12],
            preview
        );
    }

    let total_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
    println!(
        "\n{} chunks, {} tokens total, {:.1} tokens/chunk avg",
        chunks.len(),
        total_tokens,
        if chunks.is_empty() {
            0.0
        } else {
            total_tokens as f64 / chunks.len() as f64
        }
    );
    Ok(())
}

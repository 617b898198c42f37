use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::indexer::{Indexer, load_records};
use crate::llm::ChatClient;
use crate::memory::{ConversationLog, Feedback, MemoryError};
use crate::retrieval::{Query, SearchContext, SearchResult, bundle};

/// Embed a metadata file and write the index bundle
#[inline]
pub fn build_index(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let destination = output.map_or_else(|| config.bundle_path(), Path::to_path_buf);
    info!(
        "Building index from {} into {}",
        input.display(),
        destination.display()
    );

    let records = load_records(input)
        .with_context(|| format!("Failed to load metadata from {}", input.display()))?;
    println!("Loaded {} metadata records", records.len());

    let client =
        EmbeddingClient::new(&config.embedding).context("Failed to create embedding client")?;
    let indexer = Indexer::new(
        client,
        config.retrieval.metric,
        config.embedding.batch_size as usize,
    );

    let context = indexer
        .build_and_save(records, &destination)
        .context("Failed to build index")?;

    println!("✓ Indexed {} entries", context.len());
    println!("  Dimension: {}", context.index().dimension());
    println!("  Metric: {}", context.index().metric());
    println!("  Bundle: {}", destination.display());
    Ok(())
}

/// Print the closest metadata entries for `query`
#[inline]
pub fn search_metadata(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let context = load_context(config)?;
    let client =
        EmbeddingClient::new(&config.embedding).context("Failed to create embedding client")?;
    let k = k.unwrap_or(config.retrieval.top_k);

    let results = context
        .search(Query::Text(query), k, &client)
        .context("Search failed")?;

    if results.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    println!("Top {} matches for \"{}\":", results.len(), query);
    println!();
    print_matches(&results);
    Ok(())
}

/// Answer a question from the index and record the exchange
#[inline]
pub fn ask_question(config: &Config, question: &str, k: Option<usize>) -> Result<()> {
    let context = load_context(config)?;
    let embedder =
        EmbeddingClient::new(&config.embedding).context("Failed to create embedding client")?;
    let generator = ChatClient::new(&config.llm).context("Failed to create chat client")?;

    let assistant = Assistant::new(context, embedder, generator, open_memory(config))
        .with_top_k(config.retrieval.top_k)
        .with_context_turns(config.retrieval.context_turns);

    let turn = assistant.ask(question, k)?;

    println!("{}", turn.answer);
    println!();
    println!("Sources:");
    print_matches(&turn.matches);
    println!();
    println!("Turn ID: {}", turn.id);
    println!("Rate this answer with: metadata-rag feedback {} like|dislike", turn.id);
    Ok(())
}

#[inline]
pub fn record_feedback(
    config: &Config,
    turn_id: &str,
    feedback: Feedback,
    comment: Option<String>,
) -> Result<()> {
    let id = Uuid::parse_str(turn_id).with_context(|| format!("Invalid turn ID: {}", turn_id))?;
    let memory = open_memory(config);

    if memory.update_feedback(id, feedback, comment)? {
        println!("✓ Feedback recorded for turn {}", id);
    } else {
        println!("⚠️  No turn found with ID {}", id);
        println!("Use 'metadata-rag history' to list recent turns.");
    }
    Ok(())
}

/// Print the most recent turns, oldest first
#[inline]
pub fn show_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let memory = open_memory(config);
    let turns = memory.recent(limit.unwrap_or(config.retrieval.history_turns))?;

    if turns.is_empty() {
        println!("No conversation history yet.");
        println!("Use 'metadata-rag ask <question>' to start.");
        return Ok(());
    }

    for turn in &turns {
        println!(
            "🕑 {} ({})",
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            turn.id
        );
        println!("   Q: {}", turn.query);
        println!("   A: {}", turn.answer);
        if let Some(feedback) = turn.feedback_type {
            match &turn.comment {
                Some(comment) => println!("   Feedback: {} ({})", feedback, comment),
                None => println!("   Feedback: {}", feedback),
            }
        }
        println!();
    }
    println!("{} turn(s) shown", turns.len());
    Ok(())
}

#[inline]
pub fn clear_history(config: &Config) -> Result<()> {
    open_memory(config)
        .clear()
        .context("Failed to clear conversation history")?;
    println!("🗑️  Conversation history cleared.");
    Ok(())
}

/// Report configuration, index bundle and memory state
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Metadata Assistant Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    if config.config_file_path().exists() {
        println!("   📄 File: {}", config.config_file_path().display());
    } else {
        println!("   📄 File: not written yet (defaults in use)");
    }
    println!(
        "   🤖 Embedding: {} ({} dims)",
        config.embedding.model, config.embedding.dimension
    );
    println!("   💬 Answer Model: {}", config.llm.model);
    println!();

    println!("🔍 Index Bundle:");
    let bundle_path = config.bundle_path();
    match bundle::inspect(&bundle_path) {
        Ok(info) => {
            println!("   ✅ {}", bundle_path.display());
            println!("   📦 Format Version: {}", info.version);
            println!("   📐 Metric: {}", info.metric);
            println!("   🔢 Entries: {} x {} dims", info.count, info.dimension);
            if info.dimension != config.embedding.dimension as usize {
                warn!(
                    "Bundle dimension {} differs from configured dimension {}",
                    info.dimension, config.embedding.dimension
                );
                println!(
                    "   ⚠️  Configured embedding dimension is {}; rebuild the index",
                    config.embedding.dimension
                );
            }
        }
        Err(crate::retrieval::RetrievalError::BundleNotFound { .. }) => {
            println!("   ❌ No index built yet");
            println!("   Use 'metadata-rag build --input <file>' to create one.");
        }
        Err(e) => println!("   ❌ Unreadable: {}", e),
    }
    println!();

    println!("🧠 Conversation Memory:");
    match open_memory(config).load() {
        Ok(turns) => {
            let rated = turns.iter().filter(|t| t.feedback_type.is_some()).count();
            println!("   💬 Turns: {}", turns.len());
            println!("   👍 Rated: {}", rated);
        }
        Err(MemoryError::Corrupt { path, reason }) => {
            println!("   ⚠️  {} is corrupt: {}", path.display(), reason);
            println!("   Use 'metadata-rag clear-history' to reset it.");
        }
        Err(e) => println!("   ❌ Unreadable: {}", e),
    }

    Ok(())
}

fn load_context(config: &Config) -> Result<SearchContext> {
    let path = config.bundle_path();
    SearchContext::load(&path).with_context(|| {
        format!(
            "Failed to load index bundle {}; run 'metadata-rag build' first",
            path.display()
        )
    })
}

fn open_memory(config: &Config) -> ConversationLog {
    ConversationLog::open(config.memory_path())
}

fn print_matches(results: &[SearchResult]) {
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {}.{} (distance {:.4})",
            rank + 1,
            result.table,
            result.column,
            result.distance
        );
        println!("    {}", result.doc);
    }
}

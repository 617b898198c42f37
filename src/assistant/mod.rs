// Assistant module
// Retrieve, prompt, answer and remember: one question at a time

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::embeddings::TextEmbedder;
use crate::llm::{AnswerGenerator, Prompt};
use crate::memory::{ConversationLog, Turn};
use crate::retrieval::{Query, SearchContext, SharedContext};

/// Question answering over a loaded search context.
///
/// The context can be swapped with [`Assistant::reload`] while other
/// threads are answering; each question sees one consistent snapshot.
pub struct Assistant<E, G> {
    context: SharedContext,
    embedder: E,
    generator: G,
    memory: ConversationLog,
    top_k: usize,
    context_turns: usize,
}

impl<E: TextEmbedder, G: AnswerGenerator> Assistant<E, G> {
    #[inline]
    pub fn new(context: SearchContext, embedder: E, generator: G, memory: ConversationLog) -> Self {
        Self {
            context: SharedContext::new(context),
            embedder,
            generator,
            memory,
            top_k: 5,
            context_turns: 6,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Number of prior turns replayed into each prompt.
    #[inline]
    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    #[inline]
    pub fn memory(&self) -> &ConversationLog {
        &self.memory
    }

    #[inline]
    pub fn context(&self) -> Arc<SearchContext> {
        self.context.snapshot()
    }

    /// Answer `question` using the configured `top_k`, or `k` when given,
    /// and record the exchange in memory.
    #[inline]
    pub fn ask(&self, question: &str, k: Option<usize>) -> Result<Turn> {
        let k = k.unwrap_or(self.top_k);
        let matches = self
            .context
            .search(Query::Text(question), k, &self.embedder)?;
        debug!("Retrieved {} matches for question", matches.len());

        let history = self.memory.recent(self.context_turns)?;
        let prompt = Prompt::assemble(question, &matches, &history);
        let answer = self.generator.generate(&prompt)?;

        let turn = self.memory.append(question, &answer, matches)?;
        info!("Answered question as turn {}", turn.id);
        Ok(turn)
    }

    /// Load a bundle from `path` and serve it for subsequent questions.
    /// Returns the number of entries now searchable.
    #[inline]
    pub fn reload(&self, path: &Path) -> Result<usize> {
        let context = SearchContext::load(path)?;
        let len = context.len();
        self.context.replace(context);
        info!("Reloaded search context from {} ({} entries)", path.display(), len);
        Ok(len)
    }
}

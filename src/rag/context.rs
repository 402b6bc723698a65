//! Context building for RAG responses.

use super::Source;
use crate::error::Result;
use crate::generation::{ChatMessage, Role};
use crate::indexer::KnowledgeBase;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::debug;

/// Retrieves the advisor records closest to a query.
pub struct ContextBuilder {
    knowledge_base: Arc<KnowledgeBase>,
    top_k: usize,
    retry: RetryPolicy,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge_base,
            top_k: 2,
            retry: RetryPolicy::none(),
        }
    }

    /// Set the number of records to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retry policy for the query embedding call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embed the query and return the closest records, nearest first.
    pub async fn build(&self, query: &str) -> Result<Vec<Source>> {
        let embedder = self.knowledge_base.embedder();
        let query_embedding = self
            .retry
            .run("Query embedding", || embedder.embed(query))
            .await?;

        let neighbors = self.knowledge_base.index().search(&query_embedding, self.top_k)?;
        debug!("Retrieved {} of {} records", neighbors.len(), self.knowledge_base.index().len());

        Ok(self
            .knowledge_base
            .resolve(&neighbors)
            .zip(neighbors.iter())
            .map(|((record, distance), n)| Source::from_record(n.row, record, distance))
            .collect())
    }
}

/// Join retrieved records into the context block of a prompt.
pub fn format_context_for_prompt(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `window` user/assistant messages of a conversation.
pub fn recent_history(history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let turns: Vec<&ChatMessage> = history.iter().filter(|m| m.role != Role::System).collect();
    let start = turns.len().saturating_sub(window);
    turns[start..].iter().map(|m| (*m).clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::indexer::tests::{faculty, keyword_embedder};
    use crate::indexer::CorpusIndexer;

    async fn knowledge_base() -> Arc<KnowledgeBase> {
        let indexer = CorpusIndexer::new(Arc::new(keyword_embedder()), DistanceMetric::L2);
        Arc::new(indexer.build(faculty()).await.unwrap())
    }

    #[tokio::test]
    async fn test_build_returns_closest_records() {
        let builder = ContextBuilder::new(knowledge_base().await).with_top_k(2);
        let sources = builder.build("Who teaches compiler design?").await.unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "Grace Hopper");
        assert_eq!(sources[0].row, 2);
        assert!(sources[0].distance <= sources[1].distance);
    }

    #[tokio::test]
    async fn test_top_k_beyond_corpus_returns_all() {
        let builder = ContextBuilder::new(knowledge_base().await).with_top_k(10);
        let sources = builder.build("anything").await.unwrap();

        let mut rows: Vec<usize> = sources.iter().map(|s| s.row).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_context_joins_with_newlines() {
        let sources = vec![
            Source::from_record(0, &faculty().get(0).unwrap().clone(), 0.0),
            Source::from_record(1, &faculty().get(1).unwrap().clone(), 0.5),
        ];
        let context = format_context_for_prompt(&sources);
        assert_eq!(context.lines().count(), 2);
        assert!(context.starts_with("Jun Zhuang works on AI, ML."));
    }

    #[test]
    fn test_recent_history_window() {
        let history = vec![
            ChatMessage::system("ignored"),
            ChatMessage::user("1"),
            ChatMessage::assistant("2"),
            ChatMessage::user("3"),
            ChatMessage::assistant("4"),
        ];

        let recent = recent_history(&history, 3);
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);

        assert!(recent_history(&history, 0).is_empty());
        assert_eq!(recent_history(&history, 100).len(), 4);
    }
}

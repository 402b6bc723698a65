//! Corpus indexing: embeds every record once and builds the search index.

use crate::config::{DistanceMetric, Settings};
use crate::corpus::{Corpus, Record};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{AdvisorError, Result};
use crate::index::{FlatIndex, Neighbor};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{info, instrument};

/// A corpus, its index, and the embedder that produced the index.
///
/// Queries must be embedded with the same embedder so that query and record
/// vectors share one space.
pub struct KnowledgeBase {
    corpus: Corpus,
    embedder: Arc<dyn Embedder>,
    index: FlatIndex,
}

impl KnowledgeBase {
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Records for the given neighbours, paired with their distances.
    pub fn resolve<'a>(
        &'a self,
        neighbors: &'a [Neighbor],
    ) -> impl Iterator<Item = (&'a Record, f32)> + 'a {
        neighbors
            .iter()
            .filter_map(|n| self.corpus.get(n.row).map(|record| (record, n.distance)))
    }
}

/// Builds a [`KnowledgeBase`] from a corpus.
pub struct CorpusIndexer {
    embedder: Arc<dyn Embedder>,
    metric: DistanceMetric,
    retry: RetryPolicy,
}

impl CorpusIndexer {
    /// Create an indexer with an explicit embedder.
    pub fn new(embedder: Arc<dyn Embedder>, metric: DistanceMetric) -> Self {
        Self {
            embedder,
            metric,
            retry: RetryPolicy::none(),
        }
    }

    /// Create an indexer from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = create_embedder(&settings.embedding, settings.generation.timeout())?;
        Ok(Self::new(embedder, settings.index.metric)
            .with_retry(RetryPolicy::from_settings(&settings.retry)))
    }

    /// Retry policy for the embedding call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embed every record and build the index. All-or-nothing.
    #[instrument(skip(self, corpus), fields(records = corpus.len()))]
    pub async fn build(&self, corpus: Corpus) -> Result<KnowledgeBase> {
        if corpus.is_empty() {
            return Err(AdvisorError::EmptyCorpus);
        }

        let texts = corpus.document_texts();
        let embedder = &self.embedder;
        let embeddings = self
            .retry
            .run("Corpus embedding", || embedder.embed_batch(&texts))
            .await?;

        if embeddings.len() != corpus.len() {
            return Err(AdvisorError::MalformedResponse(format!(
                "Expected {} embeddings, received {}",
                corpus.len(),
                embeddings.len()
            )));
        }

        let index = FlatIndex::build(embeddings, self.metric)?;
        if index.dimensions() != self.embedder.dimensions() {
            return Err(AdvisorError::DimensionMismatch {
                expected: self.embedder.dimensions(),
                actual: index.dimensions(),
            });
        }
        info!(
            "Indexed {} records ({} dimensions, {} distance)",
            index.len(),
            index.dimensions(),
            index.metric()
        );

        Ok(KnowledgeBase {
            corpus,
            embedder: self.embedder.clone(),
            index,
        })
    }
}

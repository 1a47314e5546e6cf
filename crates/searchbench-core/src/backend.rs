//! The contract every search backend implements.
//!
//! Backends wrap an external engine behind a uniform surface so the
//! workloads can drive any of them interchangeably. Ingestion receives
//! a lazy document stream and flushes it in batches of the requested
//! size. Query operations never fail: a backend that cannot answer
//! logs the cause and returns an empty hit list, so one bad query does
//! not abort a benchmark run.

use async_trait::async_trait;

use crate::document::{Document, IndexSchema, SearchHit};

/// Lazy, fallible stream of corpus documents handed to `index_documents`.
pub type DocumentStream<'a> = Box<dyn Iterator<Item = anyhow::Result<Document>> + Send + 'a>;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short engine label used in result names and reports.
    fn engine(&self) -> &str;

    /// Establish the client session. Must be called before any other
    /// operation.
    async fn connect(&mut self) -> anyhow::Result<()>;

    /// Release the client session. Idempotent.
    async fn disconnect(&mut self);

    /// Cheap liveness probe. Never fails; an unreachable engine is
    /// reported as `false`.
    async fn health_check(&self) -> bool;

    /// Delete the index if it exists. Deleting a missing index is a
    /// success, so runs are repeatable from any starting state.
    async fn reset_index(&self, index: &str) -> anyhow::Result<()>;

    /// Create the index with the engine's translation of `schema`.
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> anyhow::Result<()>;

    /// Ingest the stream in flushes of `batch_size` documents, the last
    /// flush holding the remainder. Returns how many documents the
    /// engine acknowledged, which may be lower than the number
    /// submitted.
    async fn index_documents(
        &self,
        index: &str,
        docs: DocumentStream<'_>,
        batch_size: usize,
    ) -> anyhow::Result<u64>;

    /// Number of documents the engine reports for the index.
    async fn get_doc_count(&self, index: &str) -> anyhow::Result<u64>;

    /// Full-text search over the schema's text fields.
    async fn lexical_search(&self, index: &str, query: &str, limit: usize) -> Vec<SearchHit>;

    /// Nearest-neighbour search over the dense vector space.
    async fn vector_search(&self, index: &str, vector: &[f32], limit: usize) -> Vec<SearchHit>;

    /// Combined lexical and vector search. Backends with native fusion
    /// rank server-side; the rest fuse client-side with reciprocal
    /// rank fusion.
    async fn hybrid_search(
        &self,
        index: &str,
        query: &str,
        vector: &[f32],
        limit: usize,
    ) -> Vec<SearchHit>;
}

/// Groups a document stream into ingestion batches.
///
/// Every yielded batch except the last holds exactly `batch_size`
/// documents. A read error from the underlying stream surfaces
/// immediately and ends iteration.
pub struct Batches<'a> {
    docs: DocumentStream<'a>,
    batch_size: usize,
    done: bool,
}

impl<'a> Batches<'a> {
    pub fn new(docs: DocumentStream<'a>, batch_size: usize) -> Self {
        Self {
            docs,
            batch_size: batch_size.max(1),
            done: false,
        }
    }
}

impl Iterator for Batches<'_> {
    type Item = anyhow::Result<Vec<Document>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.docs.next() {
                Some(Ok(doc)) => batch.push(doc),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Payload;
    use anyhow::anyhow;

    fn docs(n: u64) -> DocumentStream<'static> {
        Box::new((0..n).map(|id| {
            Ok(Document {
                id,
                fields: Payload::new(),
                embedding: vec![0.0; 4],
                sparse: None,
            })
        }))
    }

    #[test]
    fn remainder_lands_in_the_final_batch() {
        let sizes: Vec<usize> = Batches::new(docs(1050), 500)
            .map(|batch| batch.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![500, 500, 50]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let sizes: Vec<usize> = Batches::new(docs(1000), 500)
            .map(|batch| batch.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![500, 500]);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert_eq!(Batches::new(docs(0), 100).count(), 0);
    }

    #[test]
    fn batch_size_is_clamped_to_one() {
        let sizes: Vec<usize> = Batches::new(docs(3), 0)
            .map(|batch| batch.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![1, 1, 1]);
    }

    #[test]
    fn stream_error_surfaces_and_ends_iteration() {
        let stream: DocumentStream<'static> = Box::new(
            (0..3u64)
                .map(|id| {
                    Ok(Document {
                        id,
                        fields: Payload::new(),
                        embedding: Vec::new(),
                        sparse: None,
                    })
                })
                .chain(std::iter::once(Err(anyhow!("truncated corpus")))),
        );
        let mut batches = Batches::new(stream, 2);
        assert_eq!(batches.next().unwrap().unwrap().len(), 2);
        assert!(batches.next().unwrap().is_err());
        assert!(batches.next().is_none());
    }

    #[test]
    fn documents_keep_stream_order() {
        let ids: Vec<u64> = Batches::new(docs(5), 2)
            .flat_map(|batch| batch.unwrap().into_iter().map(|d| d.id).collect::<Vec<_>>())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}

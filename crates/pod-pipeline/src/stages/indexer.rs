//! Indexer (§4.F): uploads transcript and description documents, tagged
//! with scoped metadata, to the grounded-generation store so later
//! searches can ground on them with citations. The store is backed by
//! `LanceDB`, exactly as the base workspace backs its own full-text
//! search table; "create-or-get" and an in-memory display-name cache
//! give upload idempotency without a second round trip per call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::index::Index;
use lancedb::index::scalar::FullTextSearchQuery;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::OptimizeAction;
use tokio::sync::RwLock;

use crate::document_store::{DocumentStore, RetrievedChunk};
use crate::error::PipelineError;

/// Table holding every uploaded document (transcripts and descriptions
/// share one table, distinguished by `doc_type`).
pub const DOCUMENTS_TABLE: &str = "documents";

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const MAX_TAG_VALUE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Transcript,
    Description,
}

impl DocumentType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Description => "description",
        }
    }
}

/// Structured tags attached to an uploaded document (§4.F).
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub podcast: String,
    pub episode: Option<String>,
    pub release_date: Option<String>,
    pub hosts: Vec<String>,
    pub guests: Vec<String>,
    pub keywords: Vec<String>,
    pub summary: Option<String>,
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("resource_name", DataType::Utf8, false),
        Field::new("display_name", DataType::Utf8, false),
        Field::new("doc_type", DataType::Utf8, false),
        Field::new("podcast", DataType::Utf8, false),
        Field::new("episode", DataType::Utf8, true),
        Field::new("release_date", DataType::Utf8, true),
        Field::new("hosts", DataType::Utf8, true),
        Field::new("guests", DataType::Utf8, true),
        Field::new("keywords", DataType::Utf8, true),
        Field::new("summary", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, false),
    ]))
}

/// Uploads transcripts and podcast descriptions to a single document
/// store keyed by `display_name`.
pub struct Indexer {
    connection: lancedb::Connection,
    existing_display_names: RwLock<HashSet<String>>,
}

impl Indexer {
    /// Connects to the `LanceDB` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the connection cannot be established.
    pub async fn connect(path: &str) -> Result<Self, PipelineError> {
        let connection = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;
        Ok(Self {
            connection,
            existing_display_names: RwLock::new(HashSet::new()),
        })
    }

    /// Finds or creates the documents table, and warms the idempotency
    /// cache from whatever is already present.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the table cannot be created or listed.
    pub async fn create_or_get_store(&self) -> Result<(), PipelineError> {
        if self.connection.open_table(DOCUMENTS_TABLE).execute().await.is_err() {
            let empty = RecordBatch::new_empty(schema());
            let batches = RecordBatchIterator::new(vec![Ok(empty)].into_iter(), schema());
            self.connection
                .create_table(DOCUMENTS_TABLE, Box::new(batches))
                .execute()
                .await
                .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;
        }
        self.refresh_display_name_cache().await
    }

    /// Builds (or rebuilds) the full-text index on the `text` column, so
    /// `search` can do more than a full scan. Safe to call repeatedly;
    /// `LanceDB` replaces an existing index of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IndexOperationFailed` if index creation or
    /// the subsequent optimize pass fails.
    pub async fn create_fts_index(&self) -> Result<(), PipelineError> {
        let table = self
            .connection
            .open_table(DOCUMENTS_TABLE)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        table
            .create_index(&["text"], Index::FTS(lancedb::index::scalar::FtsIndexBuilder::default()))
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        table
            .optimize(OptimizeAction::All)
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;
        Ok(())
    }

    async fn refresh_display_name_cache(&self) -> Result<(), PipelineError> {
        let table = self
            .connection
            .open_table(DOCUMENTS_TABLE)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = table
            .query()
            .select(lancedb::query::Select::Columns(vec!["display_name".to_string()]))
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        let mut cache = self.existing_display_names.write().await;
        cache.clear();
        for batch in &batches {
            if let Some(col) = batch
                .column_by_name("display_name")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            {
                for i in 0..col.len() {
                    if !col.is_null(i) {
                        cache.insert(col.value(i).to_string());
                    }
                }
            }
        }
        Ok(())
    }

    /// Uploads `text` as a document tagged with `metadata`. If
    /// `display_name` already exists in the store and `skip_existing` is
    /// set, returns the existing resource name without re-uploading
    /// (§4.F idempotency, tested by S6).
    ///
    /// Upload is modeled as an async operation the caller polls with a
    /// bounded timeout; a real remote store's long-running-operation
    /// semantics are preserved even though the local `LanceDB` write
    /// itself completes promptly.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IndexUploadTimeout` if the write exceeds
    /// the default 5-minute deadline, or `PipelineError::IndexOperationFailed`
    /// on any other store error.
    pub async fn upload_transcript_text(
        &self,
        text: &str,
        display_name: &str,
        doc_type: DocumentType,
        metadata: &DocumentMetadata,
        skip_existing: bool,
    ) -> Result<String, PipelineError> {
        if skip_existing && self.existing_display_names.read().await.contains(display_name) {
            return Ok(display_name.to_string());
        }

        let resource_name = display_name.to_string();
        let write = self.write_document(text, display_name, &resource_name, doc_type, metadata);

        tokio::time::timeout(DEFAULT_UPLOAD_TIMEOUT, write)
            .await
            .map_err(|_| PipelineError::IndexUploadTimeout(DEFAULT_UPLOAD_TIMEOUT))??;

        self.existing_display_names
            .write()
            .await
            .insert(display_name.to_string());
        Ok(resource_name)
    }

    async fn write_document(
        &self,
        text: &str,
        display_name: &str,
        resource_name: &str,
        doc_type: DocumentType,
        metadata: &DocumentMetadata,
    ) -> Result<(), PipelineError> {
        let normalized_text = normalize_unicode(text);
        let schema = schema();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![resource_name.to_string()])),
                Arc::new(StringArray::from(vec![display_name.to_string()])),
                Arc::new(StringArray::from(vec![doc_type.as_str().to_string()])),
                Arc::new(StringArray::from(vec![truncate_tag(&metadata.podcast)])),
                Arc::new(StringArray::from(vec![metadata.episode.as_deref().map(truncate_tag)])),
                Arc::new(StringArray::from(vec![metadata.release_date.as_deref().map(truncate_tag)])),
                Arc::new(StringArray::from(vec![Some(truncate_tag(&flatten(&metadata.hosts)))])),
                Arc::new(StringArray::from(vec![Some(truncate_tag(&flatten(&metadata.guests)))])),
                Arc::new(StringArray::from(vec![Some(truncate_tag(&flatten(&metadata.keywords)))])),
                Arc::new(StringArray::from(vec![metadata.summary.as_deref().map(truncate_tag)])),
                Arc::new(StringArray::from(vec![normalized_text])),
            ],
        )
        .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        let table = self
            .connection
            .open_table(DOCUMENTS_TABLE)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;
        Ok(())
    }
}

impl DocumentStore for Indexer {
    async fn search(
        &self,
        query: &str,
        filter: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, PipelineError> {
        let table = self
            .connection
            .open_table(DOCUMENTS_TABLE)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        let mut search = table.query();
        if !filter.is_empty() {
            search = search.only_if(filter.to_string());
        }

        let batches: Vec<RecordBatch> = search
            .full_text_search(FullTextSearchQuery::new(query.to_string()))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| PipelineError::IndexOperationFailed(e.to_string()))?;

        Ok(batches.iter().flat_map(chunks_from_batch).collect())
    }
}

fn chunks_from_batch(batch: &RecordBatch) -> Vec<RetrievedChunk> {
    let Some(titles) = batch.column_by_name("display_name").and_then(|c| c.as_any().downcast_ref::<StringArray>())
    else {
        return Vec::new();
    };
    let Some(texts) = batch.column_by_name("text").and_then(|c| c.as_any().downcast_ref::<StringArray>()) else {
        return Vec::new();
    };

    (0..batch.num_rows())
        .filter(|&i| !titles.is_null(i) && !texts.is_null(i))
        .map(|i| RetrievedChunk {
            title: titles.value(i).to_string(),
            text: texts.value(i).to_string(),
        })
        .collect()
}

fn flatten(values: &[String]) -> String {
    values.join(", ")
}

fn truncate_tag(value: &str) -> String {
    let normalized = normalize_unicode(value);
    normalized.chars().take(MAX_TAG_VALUE_LEN).collect()
}

/// Normalizes curly quotes, en/em dashes, and ellipsis to their ASCII
/// equivalents (§4.F).
#[must_use]
pub fn normalize_unicode(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            _ => c,
        })
        .collect::<String>()
        .replace('\u{2026}', "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_curly_quotes_and_dashes() {
        let out = normalize_unicode("\u{201C}Rock\u{2019}n\u{2019}Roll\u{201D} \u{2013} live\u{2026}");
        assert_eq!(out, "\"Rock'n'Roll\" - live...");
    }

    #[test]
    fn truncates_long_tag_values() {
        let long = "a".repeat(400);
        assert_eq!(truncate_tag(&long).chars().count(), MAX_TAG_VALUE_LEN);
    }

    #[test]
    fn flattens_lists_to_comma_separated() {
        assert_eq!(flatten(&["a".to_string(), "b".to_string()]), "a, b");
    }
}

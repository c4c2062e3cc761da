//! Batch rounds: analyze links in order, collect rows, flush to a report.
use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::analyzer::{Analysis, AnalysisError, PostAnalyzer};
use crate::model::AnalysisRecord;

/// Durable tabular report that rounds are appended to.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Append `records` to `report` (creating it if needed) as one unit.
    /// Returns the number of rows written.
    async fn append(&self, report: &str, records: &[AnalysisRecord]) -> Result<usize>;

    /// All rows of `report` in insertion order; empty if it does not exist.
    async fn load(&self, report: &str) -> Result<Vec<AnalysisRecord>>;
}

/// A link that produced no row, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub link: String,
    pub reason: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn from_error(link: &str, err: &AnalysisError) -> Self {
        Self {
            link: link.to_string(),
            reason: err.reason(),
            message: err.to_string(),
        }
    }
}

/// Accumulates the rows of one round until they are flushed.
pub struct BatchAggregator<'a> {
    analyzer: &'a PostAnalyzer<'a>,
    records: Vec<AnalysisRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(analyzer: &'a PostAnalyzer<'a>) -> Self {
        Self {
            analyzer,
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Analyze `links` strictly in order. Failed or invalid links add a
    /// diagnostic and no row. `observe` sees every outcome once that link
    /// is done (1-based index, link, result).
    #[instrument(skip_all, fields(links = links.len()))]
    pub async fn run<S, F>(&mut self, links: &[S], mut observe: F) -> &[AnalysisRecord]
    where
        S: AsRef<str>,
        F: FnMut(usize, &str, &Result<Analysis, AnalysisError>),
    {
        for (idx, link) in links.iter().enumerate() {
            let link = link.as_ref();
            let outcome = self.push(link).await;
            observe(idx + 1, link, &outcome);
        }
        &self.records
    }

    /// Analyze a single link and add its row, or its diagnostic, to the
    /// batch.
    pub async fn push(&mut self, link: &str) -> Result<Analysis, AnalysisError> {
        let outcome = self.analyzer.analyze(link).await;
        match &outcome {
            Ok(analysis) => self.records.push(analysis.to_record()),
            Err(err) => {
                warn!(link, reason = err.reason(), %err, "post skipped");
                self.diagnostics.push(Diagnostic::from_error(link, err));
            }
        }
        outcome
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Hand the round to `store`. The batch is cleared only once the store
    /// accepted it, so a failed flush can be retried with the same rows.
    #[instrument(skip_all, fields(report = %report, rows = self.records.len()))]
    pub async fn flush(&mut self, store: &dyn ReportStore, report: &str) -> Result<usize> {
        if self.records.is_empty() {
            self.diagnostics.clear();
            return Ok(0);
        }
        let written = store.append(report, &self.records).await?;
        info!(written, "round flushed to report");
        self.records.clear();
        self.diagnostics.clear();
        Ok(written)
    }
}

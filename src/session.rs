//! Interactive batch rounds: read link groups, analyze them, save each round.
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{error, info, instrument, warn};

use crate::analyzer::{Analysis, AnalysisError};
use crate::batch::{BatchAggregator, ReportStore};
use crate::prompt::Prompt;

/// Row counts for a whole interactive session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionTotals {
    pub written: usize,
    pub unsaved: usize,
}

/// Operator-facing text for one analyzed link.
pub fn describe_outcome(link: &str, outcome: &Result<Analysis, AnalysisError>) -> String {
    match outcome {
        Ok(analysis) => format!("\n{}", analysis.summary()),
        Err(AnalysisError::InvalidLink(_)) => format!("\nInvalid Reddit post link: {}\n", link),
        Err(err) => format!("Error processing post: {}\n", err),
    }
}

/// Run rounds until the operator stops or input ends. Rows that could not be
/// saved during a round get one more save attempt before returning.
#[instrument(skip_all, fields(report = %report))]
pub async fn run_rounds<R, W>(
    prompt: &mut Prompt<R, W>,
    batch: &mut BatchAggregator<'_>,
    store: &dyn ReportStore,
    report: &str,
) -> Result<SessionTotals>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut totals = SessionTotals::default();
    loop {
        prompt
            .say("\nPaste your Reddit post links (one per line). Enter an empty line to finish:\n")
            .await?;
        let Some(links) = prompt.read_link_group().await? else {
            break;
        };
        if links.is_empty() {
            prompt.say("No links entered.\n").await?;
        } else {
            let total = links.len();
            for (idx, link) in links.iter().enumerate() {
                prompt
                    .say(&format!("\nProcessing link {} of {}:\n", idx + 1, total))
                    .await?;
                let outcome = batch.push(link).await;
                prompt.say(&describe_outcome(link, &outcome)).await?;
            }
            totals.written += save_round(prompt, batch, store, report).await?;
        }
        if !prompt.confirm("\nDo you want to add more links? (y/n): ").await? {
            break;
        }
    }

    let pending = batch.records().len();
    if pending > 0 {
        prompt
            .say(&format!("\n{} rows from earlier rounds are not saved yet.\n", pending))
            .await?;
        totals.written += save_round(prompt, batch, store, report).await?;
        totals.unsaved = batch.records().len();
        if totals.unsaved > 0 {
            warn!(rows = totals.unsaved, "exiting with unsaved rows");
            prompt
                .say(&format!("{} rows were not saved.\n", totals.unsaved))
                .await?;
        }
    }

    info!(written = totals.written, unsaved = totals.unsaved, "session finished");
    prompt
        .say(&format!(
            "\nTotal rows written to report '{}': {}.\nExiting program.\n",
            report, totals.written
        ))
        .await?;
    Ok(totals)
}

/// Flush the batch, offering retries while the store keeps failing.
/// Returns the rows written, 0 when the operator gave up.
pub async fn save_round<R, W>(
    prompt: &mut Prompt<R, W>,
    batch: &mut BatchAggregator<'_>,
    store: &dyn ReportStore,
    report: &str,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let skipped = batch.diagnostics().len();
    loop {
        match batch.flush(store, report).await {
            Ok(written) => {
                prompt
                    .say(&format!(
                        "\nResults saved to report '{}': {} rows written, {} links skipped.\n",
                        report, written, skipped
                    ))
                    .await?;
                return Ok(written);
            }
            Err(err) => {
                error!(?err, "failed to save round");
                prompt
                    .say(&format!("\nFailed to save results: {:#}\n", err))
                    .await?;
                if !prompt.confirm("Retry saving? (y/n): ").await? {
                    warn!(rows = batch.records().len(), "rows kept in memory");
                    return Ok(0);
                }
            }
        }
    }
}

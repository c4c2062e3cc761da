//! Per-post analysis: parse, fetch, classify, compose, record.
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tracing::{info, instrument};

use crate::compose::compose;
use crate::config;
use crate::link::extract_post_id;
use crate::model::{
    AccountStatus, AnalysisRecord, CommenterCandidate, CommenterSlot, OutreachMessage,
    PostHandle, PostStatus, COMMENTER_SLOTS, DELETED_AUTHOR,
};
use crate::ranker::select_top_commenters;
use crate::reachability::Classifier;
use crate::reddit::RedditApi;

/// Operator-supplied message templates and their placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub poster: String,
    pub commenter: String,
    pub post_placeholder: String,
    pub comment_placeholder: String,
}

impl Templates {
    pub fn from_config(cfg: &config::Outreach) -> Self {
        Self {
            poster: cfg.poster_template.clone(),
            commenter: cfg.commenter_template.clone(),
            post_placeholder: cfg.post_placeholder.clone(),
            comment_placeholder: cfg.comment_placeholder.clone(),
        }
    }
}

/// Where a post's analysis was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Fetched,
    Classified,
    Composed,
    Recorded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Parsed => "parsed",
            Stage::Fetched => "fetched",
            Stage::Classified => "classified",
            Stage::Composed => "composed",
            Stage::Recorded => "recorded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid Reddit post link: {0}")]
    InvalidLink(String),
    #[error("error processing post {link} (last stage: {stage}): {message}")]
    Processing {
        link: String,
        stage: Stage,
        message: String,
    },
}

impl AnalysisError {
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::InvalidLink(_) => "invalid_link",
            AnalysisError::Processing { .. } => "processing_error",
        }
    }
}

/// Everything learned about one post.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub subreddit: String,
    pub post_link: String,
    pub post_status: PostStatus,
    pub poster: String,
    pub poster_status: AccountStatus,
    pub poster_message: Option<OutreachMessage>,
    pub commenters: Vec<CommenterCandidate>,
    pub commenter_messages: Vec<OutreachMessage>,
}

impl Analysis {
    /// Report row: always exactly three commenter slots.
    pub fn to_record(&self) -> AnalysisRecord {
        let mut slots: [CommenterSlot; COMMENTER_SLOTS] = Default::default();
        for ((slot, cand), msg) in slots
            .iter_mut()
            .zip(&self.commenters)
            .zip(&self.commenter_messages)
        {
            *slot = CommenterSlot {
                handle: format!("u/{}", cand.handle),
                upvotes: cand.score.to_string(),
                link: cand.link(),
                message: msg.text.clone(),
            };
        }
        AnalysisRecord {
            subreddit: self.subreddit.clone(),
            post_link: self.post_link.clone(),
            poster: format!("u/{}", self.poster),
            poster_status: self.poster_status.as_str().to_string(),
            post_status: self.post_status.as_str().to_string(),
            poster_message: self
                .poster_message
                .as_ref()
                .map(|m| m.text.clone())
                .unwrap_or_default(),
            commenters: slots,
        }
    }

    /// Human-readable result block printed after each post.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Analysis Result ===");
        let _ = writeln!(out, "Subreddit: {}", self.subreddit);
        let _ = writeln!(out, "Poster: u/{}", self.poster);
        let _ = writeln!(out, "Poster status: {}", self.poster_status);
        let _ = writeln!(out, "Post status: {}", self.post_status.as_str());
        if self.commenters.is_empty() {
            let _ = writeln!(out, "No commenters who can be messaged found.");
        } else {
            let _ = writeln!(out, "Top {} commenters who can be messaged:", COMMENTER_SLOTS);
            for (i, c) in self.commenters.iter().enumerate() {
                let _ = writeln!(out, "{}. u/{} (upvotes: {})", i + 1, c.handle, c.score);
            }
        }
        match &self.poster_message {
            Some(msg) => {
                let _ = writeln!(out, "\nGenerated message for poster u/{}:", msg.recipient);
                let _ = writeln!(out, "{}", msg.text);
            }
            None => {
                let _ = writeln!(out, "Poster u/{} cannot be messaged.", self.poster);
            }
        }
        for msg in &self.commenter_messages {
            let _ = writeln!(out, "\nGenerated message for commenter u/{}:", msg.recipient);
            let _ = writeln!(out, "{}", msg.text);
        }
        out
    }
}

/// Runs one post through the pipeline against an explicit session.
pub struct PostAnalyzer<'a> {
    api: &'a dyn RedditApi,
    classifier: Classifier<'a>,
    templates: Templates,
    top_k: usize,
}

impl<'a> PostAnalyzer<'a> {
    pub fn new(
        api: &'a dyn RedditApi,
        probe_deadline: Duration,
        templates: Templates,
        top_k: usize,
    ) -> Self {
        Self {
            api,
            classifier: Classifier::new(api, probe_deadline),
            templates,
            top_k,
        }
    }

    /// Analyze a single link. Never panics on platform errors: every
    /// failure comes back as an [`AnalysisError`] naming the link.
    #[instrument(skip_all, fields(link = %link))]
    pub async fn analyze(&self, link: &str) -> Result<Analysis, AnalysisError> {
        let link = link.trim();
        let handle =
            extract_post_id(link).ok_or_else(|| AnalysisError::InvalidLink(link.to_string()))?;

        let mut stage = Stage::Parsed;
        match self.run(link, &handle, &mut stage).await {
            Ok(analysis) => {
                info!(post = %handle, commenters = analysis.commenters.len(), "post analyzed");
                Ok(analysis)
            }
            Err(err) => Err(AnalysisError::Processing {
                link: link.to_string(),
                stage,
                message: format!("{:#}", err),
            }),
        }
    }

    async fn run(
        &self,
        link: &str,
        handle: &PostHandle,
        stage: &mut Stage,
    ) -> anyhow::Result<Analysis> {
        let mut thread = self
            .api
            .fetch_thread(handle)
            .await
            .with_context(|| format!("failed to fetch post {}", handle))?;
        let subreddit = format!("r/{}", thread.post.subreddit);
        let post_status = PostStatus::from_flags(thread.post.removed, thread.post.archived);
        *stage = Stage::Fetched;

        let (poster, poster_status) = match thread.post.author.clone() {
            Some(name) if !name.is_empty() && name != DELETED_AUTHOR => {
                let status = self.classifier.classify_poster(&name).await;
                (name, status)
            }
            _ => (DELETED_AUTHOR.to_string(), AccountStatus::Deleted),
        };
        let commenters =
            select_top_commenters(self.api, &self.classifier, handle, &mut thread, self.top_k)
                .await?;
        *stage = Stage::Classified;

        let poster_message = (poster_status == AccountStatus::Active).then(|| OutreachMessage {
            recipient: poster.clone(),
            text: compose(&self.templates.poster, &self.templates.post_placeholder, link),
        });
        let commenter_messages = commenters
            .iter()
            .map(|c| OutreachMessage {
                recipient: c.handle.clone(),
                text: compose(
                    &self.templates.commenter,
                    &self.templates.comment_placeholder,
                    &c.link(),
                ),
            })
            .collect();
        *stage = Stage::Composed;

        let analysis = Analysis {
            subreddit,
            post_link: link.to_string(),
            post_status,
            poster,
            poster_status,
            poster_message,
            commenters,
            commenter_messages,
        };
        *stage = Stage::Recorded;
        Ok(analysis)
    }
}

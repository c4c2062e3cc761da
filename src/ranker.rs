//! Top-K selection of reachable commenters.
use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::comments::expand_all;
use crate::model::{Comment, CommenterCandidate, PostHandle, PostThread, Verdict, DELETED_AUTHOR};
use crate::reachability::Classifier;
use crate::reddit::RedditApi;

/// Author of a comment that may be ranked at all.
///
/// Comments without an author, from removed accounts, or distinguished by a
/// moderator or admin are never candidates.
pub fn eligible_author(comment: &Comment) -> Option<&str> {
    if comment.distinguished.is_some() {
        return None;
    }
    match comment.author.as_deref() {
        None | Some("") | Some(DELETED_AUTHOR) => None,
        Some(name) => Some(name),
    }
}

/// Highest scores first, ties in input order, at most `k`.
pub fn take_top(mut candidates: Vec<CommenterCandidate>, k: usize) -> Vec<CommenterCandidate> {
    // `sort_by` is stable.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates.truncate(k);
    candidates
}

/// Expand `thread` completely, then pick the `k` best-scoring top-level
/// commenters whose accounts classify as active.
///
/// A commenter whose probes fail or error is left out; that never aborts the
/// ranking. Verdicts are reused for repeat authors within the thread.
#[instrument(skip_all, fields(post = %post, k))]
pub async fn select_top_commenters(
    api: &dyn RedditApi,
    classifier: &Classifier<'_>,
    post: &PostHandle,
    thread: &mut PostThread,
    k: usize,
) -> Result<Vec<CommenterCandidate>> {
    expand_all(api, post, thread).await?;

    let mut verdicts: HashMap<String, Verdict> = HashMap::new();
    let mut reachable = Vec::new();
    for comment in thread.comments().filter(|c| c.is_top_level()) {
        let Some(author) = eligible_author(comment) else {
            debug!(comment = %comment.id, "skipping ineligible comment");
            continue;
        };
        let verdict = match verdicts.get(author) {
            Some(v) => *v,
            None => {
                let v = classifier.classify(author).await;
                verdicts.insert(author.to_string(), v);
                v
            }
        };
        if verdict != Verdict::Active {
            debug!(author, verdict = verdict.as_str(), "commenter not reachable");
            continue;
        }
        reachable.push(CommenterCandidate {
            handle: author.to_string(),
            score: comment.score,
            comment_id: comment.id.clone(),
            permalink: comment.permalink.clone(),
        });
    }

    debug!(reachable = reachable.len(), "ranking reachable commenters");
    Ok(take_top(reachable, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(author: Option<&str>, distinguished: Option<&str>) -> Comment {
        Comment {
            id: "c".into(),
            parent_id: "t3_p".into(),
            author: author.map(str::to_string),
            score: 0,
            distinguished: distinguished.map(str::to_string),
            permalink: "/c/".into(),
        }
    }

    fn cand(handle: &str, score: i64) -> CommenterCandidate {
        CommenterCandidate {
            handle: handle.into(),
            score,
            comment_id: format!("id_{}", handle),
            permalink: format!("/c/{}/", handle),
        }
    }

    #[test]
    fn filters_ineligible_authors() {
        assert_eq!(eligible_author(&comment(Some("alice"), None)), Some("alice"));
        assert_eq!(eligible_author(&comment(None, None)), None);
        assert_eq!(eligible_author(&comment(Some("[deleted]"), None)), None);
        assert_eq!(eligible_author(&comment(Some("mod"), Some("moderator"))), None);
        assert_eq!(eligible_author(&comment(Some("admin"), Some("admin"))), None);
    }

    #[test]
    fn take_top_orders_by_score_and_keeps_ties() {
        let out = take_top(
            vec![cand("a", 7), cand("b", 10), cand("c", 7), cand("d", 1)],
            3,
        );
        let handles: Vec<&str> = out.iter().map(|c| c.handle.as_str()).collect();
        assert_eq!(handles, vec!["b", "a", "c"]);
    }

    #[test]
    fn take_top_length_is_min_of_k_and_input() {
        assert_eq!(take_top(vec![cand("a", 1)], 3).len(), 1);
        assert_eq!(take_top(vec![], 3).len(), 0);
        assert_eq!(
            take_top(vec![cand("a", 1), cand("b", 2), cand("c", 3), cand("d", 4)], 3).len(),
            3
        );
    }

    #[test]
    fn negative_scores_rank_last() {
        let out = take_top(vec![cand("neg", -4), cand("zero", 0)], 3);
        assert_eq!(out[0].handle, "zero");
        assert_eq!(out[1].handle, "neg");
    }
}

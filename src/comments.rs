//! Comment tree expansion.
use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::model::{CommentEntry, PostHandle, PostThread};
use crate::reddit::RedditApi;

/// Resolve every "load more" stub in `thread` until none remain.
///
/// Each stub is replaced in place by the entries it expands to, so the
/// resulting sequence keeps traversal order. A stub is identified by its id
/// together with its parent, since every "continue this thread" stub shares
/// the id `_`. A stub that comes back a second time is dropped instead of
/// fetched again.
#[instrument(skip_all, fields(post = %post))]
pub async fn expand_all(
    api: &dyn RedditApi,
    post: &PostHandle,
    thread: &mut PostThread,
) -> Result<()> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut fetched = 0usize;
    debug!(pending = thread.pending_stubs(), "expanding comment tree");
    let mut cursor = 0usize;

    while cursor < thread.entries.len() {
        let stub = match &thread.entries[cursor] {
            CommentEntry::Comment(_) => {
                cursor += 1;
                continue;
            }
            CommentEntry::More(stub) => stub.clone(),
        };

        if !seen.insert((stub.id.clone(), stub.parent_id.clone())) {
            warn!(stub = %stub.id, parent = %stub.parent_id, "stub returned again; dropping");
            thread.entries.remove(cursor);
            continue;
        }

        let replacement = api.fetch_more(post, &stub).await?;
        fetched += 1;
        debug!(stub = %stub.id, entries = replacement.len(), "expanded stub");
        // Re-examine from `cursor`: the replacement may itself hold stubs.
        thread.entries.splice(cursor..cursor + 1, replacement);
    }

    info!(
        stubs = fetched,
        comments = thread.entries.len(),
        "comment tree fully expanded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, MoreStub, Post};
    use crate::reddit::{AccountIdentity, AccountProfile, ProbeError};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn comment(id: &str, parent: &str) -> CommentEntry {
        CommentEntry::Comment(Comment {
            id: id.into(),
            parent_id: parent.into(),
            author: Some(format!("user_{}", id)),
            score: 1,
            distinguished: None,
            permalink: format!("/r/t/comments/p/x/{}/", id),
        })
    }

    fn more(id: &str, children: &[&str]) -> CommentEntry {
        CommentEntry::More(MoreStub {
            id: id.into(),
            parent_id: "t3_p".into(),
            children: children.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn continuation(parent: &str) -> CommentEntry {
        CommentEntry::More(MoreStub {
            id: "_".into(),
            parent_id: parent.into(),
            children: vec![],
        })
    }

    #[derive(Default)]
    struct StubApi {
        expansions: HashMap<String, Vec<CommentEntry>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RedditApi for StubApi {
        async fn fetch_thread(&self, _post: &PostHandle) -> Result<PostThread> {
            Err(anyhow!("unused"))
        }

        async fn fetch_more(
            &self,
            _post: &PostHandle,
            stub: &MoreStub,
        ) -> Result<Vec<CommentEntry>> {
            let key = if stub.children.is_empty() {
                stub.parent_id.clone()
            } else {
                stub.id.clone()
            };
            self.calls.lock().unwrap().push(key.clone());
            self.expansions
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow!("no expansion for {}", key))
        }

        async fn identity(&self, _handle: &str) -> Result<AccountIdentity, ProbeError> {
            Err(ProbeError::Missing("unused".into()))
        }

        async fn profile(&self, _handle: &str) -> Result<AccountProfile, ProbeError> {
            Err(ProbeError::Missing("unused".into()))
        }

        async fn account_exists(&self, _handle: &str) -> Result<(), ProbeError> {
            Err(ProbeError::Missing("unused".into()))
        }
    }

    fn thread(entries: Vec<CommentEntry>) -> PostThread {
        PostThread {
            post: Post {
                id: "p".into(),
                author: Some("op".into()),
                subreddit: "t".into(),
                removed: false,
                archived: false,
            },
            entries,
        }
    }

    fn ids(thread: &PostThread) -> Vec<String> {
        thread.comments().map(|c| c.id.clone()).collect()
    }

    #[tokio::test]
    async fn expands_nested_stubs_in_place() {
        let mut api = StubApi::default();
        api.expansions.insert(
            "m1".into(),
            vec![comment("c3", "t3_p"), more("m2", &["c5"]), comment("c4", "t3_p")],
        );
        api.expansions.insert("m2".into(), vec![comment("c5", "t3_p")]);

        let mut t = thread(vec![comment("c1", "t3_p"), more("m1", &["c3", "c4"]), comment("c2", "t3_p")]);
        expand_all(&api, &PostHandle::new("p"), &mut t).await.unwrap();

        assert_eq!(t.pending_stubs(), 0);
        assert_eq!(ids(&t), vec!["c1", "c3", "c5", "c4", "c2"]);
        assert_eq!(*api.calls.lock().unwrap(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn stub_returning_itself_is_dropped() {
        let mut api = StubApi::default();
        api.expansions
            .insert("m1".into(), vec![comment("c2", "t3_p"), more("m1", &["c9"])]);

        let mut t = thread(vec![comment("c1", "t3_p"), more("m1", &["c2"])]);
        expand_all(&api, &PostHandle::new("p"), &mut t).await.unwrap();

        assert_eq!(t.pending_stubs(), 0);
        assert_eq!(ids(&t), vec!["c1", "c2"]);
        assert_eq!(api.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn continuations_under_different_parents_are_all_expanded() {
        let mut api = StubApi::default();
        api.expansions
            .insert("t1_a9".into(), vec![comment("deep_a9", "t1_a9")]);
        api.expansions
            .insert("t1_b9".into(), vec![comment("deep_b9", "t1_b9")]);

        let mut t = thread(vec![
            comment("a9", "t1_a8"),
            continuation("t1_a9"),
            comment("b9", "t1_b8"),
            continuation("t1_b9"),
        ]);
        expand_all(&api, &PostHandle::new("p"), &mut t).await.unwrap();

        assert_eq!(t.pending_stubs(), 0);
        assert_eq!(ids(&t), vec!["a9", "deep_a9", "b9", "deep_b9"]);
        assert_eq!(*api.calls.lock().unwrap(), vec!["t1_a9", "t1_b9"]);
    }

    #[tokio::test]
    async fn fetch_error_propagates() {
        let api = StubApi::default();
        let mut t = thread(vec![more("missing", &["x"])]);
        assert!(expand_all(&api, &PostHandle::new("p"), &mut t).await.is_err());
    }
}

//! Account reachability classification.
//!
//! Reddit has no single "can I message this account" signal, so the status
//! is inferred from layered probes. Each layer only proves what it can:
//!
//! 1. identity: fails → suspended or deleted
//! 2. profile: passes → active, fails → cannot be messaged
//! 3. (poster only) existence re-check: passes → suspended, fails → deleted
//!
//! Any unexpected failure (network, rate limit, timeout) yields `error`.
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{AccountStatus, Verdict};
use crate::reddit::{ProbeError, RedditApi};

/// Result of one probe, stripped of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The platform answered and the evidence is absent.
    Failed,
    /// Anything that is not an answer: transport error, 429, deadline.
    Errored,
}

impl Outcome {
    pub fn of<T>(res: &Result<T, ProbeError>) -> Self {
        match res {
            Ok(_) => Outcome::Passed,
            Err(ProbeError::Missing(_)) => Outcome::Failed,
            Err(ProbeError::Unexpected(_)) => Outcome::Errored,
        }
    }
}

/// Verdict of the identity and profile layers.
///
/// `profile` is only consulted when identity passed; a missing profile
/// outcome in that case is not evidence of anything and maps to `Error`.
pub fn verdict(identity: Outcome, profile: Option<Outcome>) -> Verdict {
    match (identity, profile) {
        (Outcome::Errored, _) => Verdict::Error,
        (Outcome::Failed, _) => Verdict::SuspendedOrDeleted,
        (Outcome::Passed, Some(Outcome::Passed)) => Verdict::Active,
        (Outcome::Passed, Some(Outcome::Failed)) => Verdict::CannotBeMessaged,
        (Outcome::Passed, Some(Outcome::Errored)) | (Outcome::Passed, None) => Verdict::Error,
    }
}

/// Turn a verdict into a final status using the poster's existence re-check.
pub fn refine(verdict: Verdict, recheck: Option<Outcome>) -> AccountStatus {
    match verdict {
        Verdict::Active => AccountStatus::Active,
        Verdict::CannotBeMessaged => AccountStatus::CannotBeMessaged,
        Verdict::Error => AccountStatus::Error,
        Verdict::SuspendedOrDeleted => match recheck {
            Some(Outcome::Passed) => AccountStatus::Suspended,
            Some(Outcome::Failed) => AccountStatus::Deleted,
            Some(Outcome::Errored) | None => AccountStatus::Error,
        },
    }
}

/// Total over all outcome combinations.
pub fn classify(
    identity: Outcome,
    profile: Option<Outcome>,
    recheck: Option<Outcome>,
) -> AccountStatus {
    refine(verdict(identity, profile), recheck)
}

/// Probe outcomes gathered for one account, in the order they ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTrace {
    pub identity: Outcome,
    pub profile: Option<Outcome>,
    pub recheck: Option<Outcome>,
}

impl ProbeTrace {
    pub fn verdict(&self) -> Verdict {
        verdict(self.identity, self.profile)
    }

    pub fn status(&self) -> AccountStatus {
        classify(self.identity, self.profile, self.recheck)
    }
}

/// Runs the probes against a session, each bounded by `deadline`.
pub struct Classifier<'a> {
    api: &'a dyn RedditApi,
    deadline: Duration,
}

impl<'a> Classifier<'a> {
    pub fn new(api: &'a dyn RedditApi, deadline: Duration) -> Self {
        Self { api, deadline }
    }

    async fn probe<T, F>(&self, layer: &'static str, handle: &str, fut: F) -> Outcome
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Err(_) => {
                warn!(
                    layer,
                    handle,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "probe timed out"
                );
                Outcome::Errored
            }
            Ok(res) => {
                let outcome = Outcome::of(&res);
                match &res {
                    Err(ProbeError::Missing(reason)) => {
                        debug!(layer, handle, %reason, "probe failed")
                    }
                    Err(ProbeError::Unexpected(err)) => warn!(layer, handle, ?err, "probe errored"),
                    Ok(_) => debug!(layer, handle, "probe passed"),
                }
                outcome
            }
        }
    }

    async fn layered(&self, handle: &str) -> ProbeTrace {
        let identity = self.probe("identity", handle, self.api.identity(handle)).await;
        let profile = match identity {
            Outcome::Passed => Some(self.probe("profile", handle, self.api.profile(handle)).await),
            _ => None,
        };
        ProbeTrace {
            identity,
            profile,
            recheck: None,
        }
    }

    /// Commenter path: no re-check, the coarse verdict is enough to filter.
    pub async fn classify(&self, handle: &str) -> Verdict {
        self.layered(handle).await.verdict()
    }

    /// Poster path, with the existence re-check after a failed identity.
    pub async fn trace_poster(&self, handle: &str) -> ProbeTrace {
        let mut trace = self.layered(handle).await;
        if trace.verdict() == Verdict::SuspendedOrDeleted {
            trace.recheck = Some(
                self.probe("recheck", handle, self.api.account_exists(handle))
                    .await,
            );
        }
        trace
    }

    pub async fn classify_poster(&self, handle: &str) -> AccountStatus {
        self.trace_poster(handle).await.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Outcome; 3] = [Outcome::Passed, Outcome::Failed, Outcome::Errored];

    #[test]
    fn identity_passed_profile_decides() {
        assert_eq!(verdict(Outcome::Passed, Some(Outcome::Passed)), Verdict::Active);
        assert_eq!(
            verdict(Outcome::Passed, Some(Outcome::Failed)),
            Verdict::CannotBeMessaged
        );
        assert_eq!(verdict(Outcome::Passed, Some(Outcome::Errored)), Verdict::Error);
        assert_eq!(verdict(Outcome::Passed, None), Verdict::Error);
    }

    #[test]
    fn identity_failure_ignores_profile() {
        for p in ALL {
            assert_eq!(verdict(Outcome::Failed, Some(p)), Verdict::SuspendedOrDeleted);
            assert_eq!(verdict(Outcome::Errored, Some(p)), Verdict::Error);
        }
    }

    #[test]
    fn recheck_splits_suspended_and_deleted() {
        assert_eq!(
            classify(Outcome::Failed, None, Some(Outcome::Passed)),
            AccountStatus::Suspended
        );
        assert_eq!(
            classify(Outcome::Failed, None, Some(Outcome::Failed)),
            AccountStatus::Deleted
        );
        assert_eq!(
            classify(Outcome::Failed, None, Some(Outcome::Errored)),
            AccountStatus::Error
        );
        assert_eq!(classify(Outcome::Failed, None, None), AccountStatus::Error);
    }

    #[test]
    fn recheck_never_overrides_a_settled_verdict() {
        for r in ALL {
            assert_eq!(
                classify(Outcome::Passed, Some(Outcome::Passed), Some(r)),
                AccountStatus::Active
            );
            assert_eq!(
                classify(Outcome::Passed, Some(Outcome::Failed), Some(r)),
                AccountStatus::CannotBeMessaged
            );
            assert_eq!(classify(Outcome::Errored, None, Some(r)), AccountStatus::Error);
        }
    }

    #[test]
    fn classify_is_total() {
        let profiles = [None, Some(Outcome::Passed), Some(Outcome::Failed), Some(Outcome::Errored)];
        for i in ALL {
            for p in profiles {
                for r in profiles {
                    // Never panics; every combination lands on one status.
                    let _ = classify(i, p, r);
                }
            }
        }
    }

    #[test]
    fn outcome_from_probe_error() {
        let missing: Result<(), ProbeError> = Err(ProbeError::Missing("gone".into()));
        let unexpected: Result<(), ProbeError> =
            Err(ProbeError::Unexpected(anyhow::anyhow!("boom")));
        assert_eq!(Outcome::of(&Ok::<(), ProbeError>(())), Outcome::Passed);
        assert_eq!(Outcome::of(&missing), Outcome::Failed);
        assert_eq!(Outcome::of(&unexpected), Outcome::Errored);
    }
}

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config;
use crate::model::{CommentEntry, MoreStub, PostHandle, PostThread};
use crate::reddit::model::{
    flatten_things, Listing, MeResp, MoreChildrenResp, Thing, TokenResp, UserAbout,
    UserAboutResp,
};

pub mod model;

const REDDIT_AUTH_BASE: &str = "https://www.reddit.com/";
const REDDIT_API_BASE: &str = "https://oauth.reddit.com/";

/// `morechildren` accepts at most this many ids per call.
const MORECHILDREN_CHUNK: usize = 100;

/// Refresh the bearer token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

static ACCOUNT_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,32}$").expect("valid handle regex"));

/// Failure of a single account probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The platform answered and the evidence the probe looks for is absent.
    #[error("{0}")]
    Missing(String),
    /// Network, rate limit, timeout, malformed handle or anything else.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProfile {
    pub name: String,
    pub created: DateTime<Utc>,
}

/// Authenticated session capability the pipeline runs against.
#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Post metadata plus its comment tree as returned, stubs included.
    async fn fetch_thread(&self, post: &PostHandle) -> Result<PostThread>;

    /// Entries that replace `stub`, in traversal order. May contain new stubs.
    async fn fetch_more(&self, post: &PostHandle, stub: &MoreStub) -> Result<Vec<CommentEntry>>;

    /// Lightweight identity lookup; fails for suspended or deleted accounts.
    async fn identity(&self, handle: &str) -> Result<AccountIdentity, ProbeError>;

    /// Full profile lookup; fails for accounts without a complete profile.
    async fn profile(&self, handle: &str) -> Result<AccountProfile, ProbeError>;

    /// Whether the platform still knows the account at all.
    async fn account_exists(&self, handle: &str) -> Result<(), ProbeError>;
}

#[derive(Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct RedditClient {
    http: Client,
    auth_url: Url,
    api_url: Url,
    credentials: Credentials,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditClient")
            .field("api_url", &self.api_url)
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

impl RedditClient {
    pub fn from_config(cfg: &config::Reddit) -> Result<Self> {
        let auth_url = Url::parse(REDDIT_AUTH_BASE).context("invalid Reddit auth URL")?;
        let api_url = Url::parse(REDDIT_API_BASE).context("invalid Reddit API URL")?;
        Self::with_base_urls(cfg, auth_url, api_url)
    }

    pub fn with_base_urls(cfg: &config::Reddit, auth_url: Url, api_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent(&cfg.username))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            auth_url,
            api_url,
            credentials: Credentials {
                client_id: cfg.client_id.clone(),
                client_secret: cfg.client_secret.clone(),
                username: cfg.username.clone(),
                password: cfg.password.clone(),
            },
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Authenticate and confirm the session works. Returns the account name.
    #[instrument(skip_all)]
    pub async fn login(&self) -> Result<String> {
        let me: MeResp = self.get_json("api/v1/me", &[]).await?;
        info!(user = %me.name, "logged in to reddit");
        Ok(me.name)
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let endpoint = self
            .auth_url
            .join("api/v1/access_token")
            .context("invalid Reddit auth URL")?;
        let res = self
            .http
            .post(endpoint)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .context("failed to reach Reddit auth endpoint")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("reddit auth error {}: {}", status, body));
        }
        let payload: TokenResp = res.json().await.context("invalid Reddit token response")?;
        let value = match (payload.access_token, payload.error) {
            (_, Some(err)) => return Err(anyhow!("reddit auth rejected: {}", err)),
            (Some(token), None) => token,
            (None, None) => return Err(anyhow!("reddit auth response without token")),
        };
        debug!(expires_in = payload.expires_in, "obtained reddit access token");
        Ok(AccessToken {
            value,
            expires_at: Instant::now() + Duration::from_secs(payload.expires_in),
        })
    }

    pub fn build_get(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Request> {
        let endpoint = self.api_url.join(path).context("invalid Reddit API URL")?;
        self.http
            .get(endpoint)
            .bearer_auth(token)
            .query(query)
            .build()
            .context("failed to build Reddit request")
    }

    async fn send_get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let token = self.bearer().await?;
        let request = self.build_get(&token, path, query)?;
        debug!(url = %request.url(), "sending reddit request");
        self.http
            .execute(request)
            .await
            .context("failed to reach Reddit")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let res = self.send_get(path, query).await?;
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("received 429 from Reddit: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("reddit error {} on {}: {}", status, path, body));
        }
        res.json::<T>()
            .await
            .with_context(|| format!("invalid Reddit response for {}", path))
    }

    /// `GET /user/{name}/about`, read through [`probe_error_for`].
    async fn about(&self, handle: &str) -> Result<UserAbout, ProbeError> {
        if !ACCOUNT_HANDLE.is_match(handle) {
            return Err(ProbeError::Unexpected(anyhow!(
                "malformed account handle: {:?}",
                handle
            )));
        }
        let path = format!("user/{}/about", handle);
        let res = self.send_get(&path, &[("raw_json", "1")]).await?;
        if let Some(err) = probe_error_for(res.status(), handle) {
            let body = res.text().await.unwrap_or_default();
            debug!(handle, %body, "probe rejected");
            return Err(err);
        }
        let payload: UserAboutResp = res
            .json()
            .await
            .context("invalid Reddit user response")?;
        Ok(payload.data)
    }

    async fn fetch_continuation(
        &self,
        post: &PostHandle,
        stub: &MoreStub,
    ) -> Result<Vec<CommentEntry>> {
        let parent = stub
            .parent_id
            .strip_prefix("t1_")
            .ok_or_else(|| anyhow!("continuation stub {} has no comment parent", stub.id))?;
        let path = format!("comments/{}", post.as_str());
        let listings: Vec<Listing> = self
            .get_json(&path, &[("comment", parent), ("raw_json", "1"), ("limit", "500")])
            .await?;
        continuation_entries(listings, parent)
    }

    async fn fetch_children(
        &self,
        post: &PostHandle,
        stub: &MoreStub,
    ) -> Result<Vec<CommentEntry>> {
        let link_id = post.fullname();
        let mut entries = Vec::new();
        for chunk in stub.children.chunks(MORECHILDREN_CHUNK) {
            let children = chunk.join(",");
            let payload: MoreChildrenResp = self
                .get_json(
                    "api/morechildren",
                    &[
                        ("api_type", "json"),
                        ("link_id", link_id.as_str()),
                        ("children", children.as_str()),
                        ("raw_json", "1"),
                    ],
                )
                .await?;
            if !payload.json.errors.is_empty() {
                return Err(anyhow!(
                    "morechildren for {} failed: {:?}",
                    stub.id,
                    payload.json.errors
                ));
            }
            let things = payload.json.data.map(|d| d.things).unwrap_or_default();
            flatten_things(things, &mut entries);
        }
        Ok(entries)
    }
}

#[async_trait]
impl RedditApi for RedditClient {
    #[instrument(skip_all, fields(post = %post))]
    async fn fetch_thread(&self, post: &PostHandle) -> Result<PostThread> {
        let path = format!("comments/{}", post.as_str());
        let listings: Vec<Listing> = self
            .get_json(&path, &[("raw_json", "1"), ("limit", "500")])
            .await?;
        let mut listings = listings.into_iter();
        let head = listings
            .next()
            .ok_or_else(|| anyhow!("post {} returned no listings", post))?;
        let link = head
            .data
            .children
            .into_iter()
            .find_map(|t| match t {
                Thing::Link(l) => Some(l),
                _ => None,
            })
            .ok_or_else(|| anyhow!("post {} not found", post))?;
        let mut entries = Vec::new();
        if let Some(comments) = listings.next() {
            flatten_things(comments.data.children, &mut entries);
        }
        Ok(PostThread {
            post: link.into(),
            entries,
        })
    }

    #[instrument(skip_all, fields(post = %post, stub = %stub.id))]
    async fn fetch_more(&self, post: &PostHandle, stub: &MoreStub) -> Result<Vec<CommentEntry>> {
        if stub.children.is_empty() {
            self.fetch_continuation(post, stub).await
        } else {
            self.fetch_children(post, stub).await
        }
    }

    async fn identity(&self, handle: &str) -> Result<AccountIdentity, ProbeError> {
        let about = self.about(handle).await?;
        match about.id {
            Some(id) => Ok(AccountIdentity {
                id,
                name: about.name,
            }),
            None => Err(ProbeError::Missing(format!(
                "u/{} has no resolvable identity",
                handle
            ))),
        }
    }

    async fn profile(&self, handle: &str) -> Result<AccountProfile, ProbeError> {
        let about = self.about(handle).await?;
        match about.created() {
            Some(created) => Ok(AccountProfile {
                name: about.name,
                created,
            }),
            None => Err(ProbeError::Missing(format!(
                "u/{} has no full profile",
                handle
            ))),
        }
    }

    async fn account_exists(&self, handle: &str) -> Result<(), ProbeError> {
        let about = self.about(handle).await?;
        if about.is_suspended {
            warn!(user = %about.name, "account is suspended");
        }
        Ok(())
    }
}

/// Probe evidence carried by a `/about` status; `None` when it succeeded.
/// 403 and 404 are confirmed absence. Everything else, 429 included, is
/// unexpected.
fn probe_error_for(status: StatusCode, handle: &str) -> Option<ProbeError> {
    match status {
        s if s.is_success() => None,
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Some(ProbeError::Missing(format!(
            "u/{} not found ({})",
            handle, status
        ))),
        StatusCode::TOO_MANY_REQUESTS => Some(ProbeError::Unexpected(anyhow!(
            "rate limited while probing u/{}",
            handle
        ))),
        s => Some(ProbeError::Unexpected(anyhow!(
            "reddit error {} probing u/{}",
            s,
            handle
        ))),
    }
}

/// Entries below `parent` from a `?comment=` thread listing. The listing is
/// rooted at the parent, which is already in the tree.
fn continuation_entries(listings: Vec<Listing>, parent: &str) -> Result<Vec<CommentEntry>> {
    let comments = listings
        .into_iter()
        .nth(1)
        .ok_or_else(|| anyhow!("continuation of {} returned no comment listing", parent))?;
    let mut entries = Vec::new();
    flatten_things(comments.data.children, &mut entries);
    entries.retain(|e| !matches!(e, CommentEntry::Comment(c) if c.id == parent));
    Ok(entries)
}

fn user_agent(username: &str) -> String {
    format!(
        "reddit-outreach:v{} (by /u/{})",
        env!("CARGO_PKG_VERSION"),
        username
    )
}

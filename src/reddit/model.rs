use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{Comment, CommentEntry, MoreStub, Post};

#[derive(Deserialize, Debug)]
pub struct TokenResp {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MeResp {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Deserialize, Debug)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "kind", content = "data")]
pub enum Thing {
    #[serde(rename = "t3")]
    Link(LinkData),
    #[serde(rename = "t1")]
    Comment(CommentData),
    #[serde(rename = "more")]
    More(MoreData),
}

#[derive(Deserialize, Debug)]
pub struct LinkData {
    pub id: String,
    pub author: Option<String>,
    pub subreddit: String,
    pub removed: Option<bool>,
    pub removed_by_category: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl From<LinkData> for Post {
    fn from(d: LinkData) -> Self {
        let removed = d.removed.unwrap_or(false) || d.removed_by_category.is_some();
        Post {
            id: d.id,
            author: d.author,
            subreddit: d.subreddit,
            removed,
            archived: d.archived,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CommentData {
    pub id: String,
    pub parent_id: String,
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    pub distinguished: Option<String>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub replies: Replies,
}

/// Reddit sends `""` for a comment without replies and a listing otherwise.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Replies {
    Listing(Box<Listing>),
    Empty(Value),
}

impl Default for Replies {
    fn default() -> Self {
        Replies::Empty(Value::Null)
    }
}

#[derive(Deserialize, Debug)]
pub struct MoreData {
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct MoreChildrenResp {
    pub json: MoreChildrenJson,
}

#[derive(Deserialize, Debug)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<Value>,
    pub data: Option<MoreChildrenData>,
}

#[derive(Deserialize, Debug)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

#[derive(Deserialize, Debug)]
pub struct UserAboutResp {
    pub data: UserAbout,
}

#[derive(Deserialize, Debug)]
pub struct UserAbout {
    pub name: String,
    pub id: Option<String>,
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub is_suspended: bool,
}

impl UserAbout {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        let ts = self.created_utc?;
        Utc.timestamp_opt(ts as i64, 0).single()
    }
}

/// Flatten things depth-first, each comment followed by its replies.
pub fn flatten_things(things: Vec<Thing>, out: &mut Vec<CommentEntry>) {
    for thing in things {
        match thing {
            Thing::Comment(c) => {
                let replies = c.replies;
                out.push(CommentEntry::Comment(Comment {
                    id: c.id,
                    parent_id: c.parent_id,
                    author: c.author,
                    score: c.score,
                    distinguished: c.distinguished,
                    permalink: c.permalink,
                }));
                if let Replies::Listing(listing) = replies {
                    flatten_things(listing.data.children, out);
                }
            }
            Thing::More(m) => out.push(CommentEntry::More(MoreStub {
                id: m.id,
                parent_id: m.parent_id,
                children: m.children,
            })),
            Thing::Link(_) => {}
        }
    }
}

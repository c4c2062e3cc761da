//! Reddit outreach: find reachable posters and top commenters for a list of
//! post links, draft templated messages for them, and append the results to
//! a tabular report.

#![recursion_limit = "256"]

pub mod analyzer;
pub mod batch;
pub mod comments;
pub mod compose;
pub mod config;
pub mod db;
pub mod link;
pub mod model;
pub mod prompt;
pub mod ranker;
pub mod reachability;
pub mod reddit;
pub mod session;

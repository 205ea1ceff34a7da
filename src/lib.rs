//! `civicwatch`: the issue-feed core behind the CivicWatch reporting app.
//!
//! Citizens report infrastructure problems, upvote them and filter the feed;
//! authorities mark them solved. Two interchangeable backends implement the
//! same [`storage::IssueStore`] contract:
//!
//! - [`storage::LocalStore`]: a `SQLite` file on this device
//! - [`storage::RemoteStore`]: a hosted PostgREST service with identity
//!
//! [`Provider`] picks one from configuration at startup. The controllers in
//! [`controller`] sequence each user flow (mutate, then refresh) and the
//! [`query`] engine turns the raw list into what the user sees.

#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod provider;
pub mod query;
pub mod storage;
pub mod validation;

pub use error::{CivicError, ErrorCode, Result, StructuredError, ValidationError, Warning};
pub use provider::Provider;

//! Belvo API client library for Rust.
//!
//! A blocking client for the [Belvo](https://developers.belvo.com) financial
//! data API.  A [`Client`] logs in once and exposes the `Accounts`, `Links`,
//! `Owners` and `Transactions` resources; list calls return a lazy
//! [`Paginated`] iterator that follows the API's `next` cursors.
//!
//! # Quick Start
//!
//! ```no_run
//! use belvo_client::{Client, Filters};
//!
//! let client = Client::new("key-id", "key-secret", "https://sandbox.belvo.com").unwrap();
//!
//! // Every link, across all pages
//! for link in client.links().list(Filters::new()) {
//!     let link = link.unwrap();
//!     println!("{}: {}", link["id"], link["institution"]);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod pagination;
pub mod session;
pub mod tui;

// Re-export the main public types at the crate root for convenience.
pub use client::{Client, Resource, ResourceKind};
pub use config::{Environment, Settings};
pub use error::{BelvoError, Result};
pub use filters::Filters;
pub use models::{Account, Balance, Institution, Link, Owner, Transaction};
pub use pagination::{Page, Paginated, Typed};
pub use session::{Session, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

//! Expense-sharing record store with a REST API and an optimistic client.
//!
//! `splitbook` keeps expenses, top-ups, users and transactions in durable
//! collections, serves them over HTTP, and ships a typed client that mirrors
//! a collection locally.
//!
//! # Layers
//!
//! - [`storage`]: the record store. JSON files, SQLite or in-memory, behind
//!   the [`storage::Storage`] and [`storage::BlockingStorage`] traits.
//! - `server`: an `axum` router over any store.
//! - `client`: async and blocking HTTP clients that are stores themselves.
//! - [`mirror`], `hooks` and [`sort`]: client-side state with optimistic
//!   create, delete and reset.
//!
//! # Features
//!
//! | feature | enables |
//! |---|---|
//! | `async` | async client and `Storage` trait |
//! | `blocking` | blocking client and `BlockingStorage` trait |
//! | `storage-file` | `FileStorage` |
//! | `storage-sqlx` | `SqliteStorage` |
//! | `server` | HTTP server |
//! | `cli` | the `splitbook` binary |

#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod error;
#[cfg(feature = "async")]
pub mod hooks;
pub mod mirror;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod sort;
pub mod storage;
pub mod validation;

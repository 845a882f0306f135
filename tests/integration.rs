//! End-to-end suite against a mock org.
//!
//! Run with:
//!   cargo test --test integration
//!
//! Set `RUST_LOG=sfkit_rest=debug` to see batch and page logs.

#[path = "integration/common.rs"]
mod common;
#[path = "integration/collections.rs"]
mod collections;
#[path = "integration/query.rs"]
mod query;
#[path = "integration/auth.rs"]
mod auth;
#[path = "integration/bulk.rs"]
mod bulk;

//! azsearch-core
//!
//! Configuration, error taxonomy, and the value types shared by the search
//! client, the embedding client and the demo binaries: index schema
//! descriptors, query requests, query results and geo helpers.

pub mod config;
pub mod documents;
pub mod error;
pub mod geo;
pub mod query;
pub mod results;
pub mod schema;

pub use error::{Error, Result};

//! Core types and the mutation engine for clinical sample records.
//!
//! A schema ([`schema::FieldDefsCollection`]) describes the static, temporal
//! and event fields of a sample. [`mutation::SampleEditor`] applies validated
//! edits to samples and writes them through a [`store::SampleStore`].
//!
//! This crate is free of HTTP and database dependencies.

pub mod compute;
pub mod engine;
pub mod error;
pub mod field;
pub mod format;
pub mod memory;
pub mod mutation;
pub mod sample;
pub mod schema;
pub mod session;
pub mod store;
pub mod value;

pub use error::{Error, Result};

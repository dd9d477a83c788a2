#![doc = "workflow-index-core: discovery, normalization and caching of workflow files hosted on GitHub."]

//! This crate holds everything behind the HTTP surface: upstream access,
//! repository exploration, shape decoding, normalization into
//! [`model::WorkflowSummary`], the TTL cache and the [`index::WorkflowIndex`]
//! query facade. The `workflow-index` crate puts a CLI and an HTTP API on top.
//!
//! # Usage
//! Build a [`index::WorkflowIndex`] with [`index::WorkflowIndex::from_config`],
//! or inject your own [`contract::Explorer`] and [`contract::RemoteClient`]
//! (mocks are exported under the default `test-export-mocks` feature).

pub mod cache;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod explore;
pub mod index;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod policy;
pub mod shape;

pub use error::{IndexError, Result};
pub use index::WorkflowIndex;

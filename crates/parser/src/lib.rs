//! Spec acquisition and loading for swaggerdoc
//!
//! This crate locates a Swagger/OpenAPI spec (remote URL candidates first,
//! then a local fallback) and loads it into a [`SpecDocument`].
//!
//! ## Formats
//! JSON and YAML are both accepted. The format is taken from the file
//! extension when there is one and sniffed from the content otherwise, so
//! the same spec in either format loads into the same document.
//!
//! ## Usage
//! ```rust,ignore
//! use swaggerdoc_parser::{load_spec, SpecAcquirer};
//!
//! let acquirer = SpecAcquirer::new();
//! let acquired = acquirer.acquire(&urls, Some(fallback), &invocation)?;
//! let document = load_spec(&acquired.location, None)?;
//! ```

mod acquire;
mod document;

pub use acquire::{Acquired, HttpFetcher, SpecAcquirer, SpecFetcher, SpecSource, MAX_SPEC_SIZE};
pub use document::{load_spec, SpecDocument, SpecFormat, SpecInfo};

//! # Strata Core
//!
//! Core vocabulary for the Strata middleware pipeline engine.
//!
//! This crate provides the foundational types shared by the pipeline crates:
//!
//! - [`PipelineError`] / [`PipelineResult`] - the engine's error model
//! - [`Token`] - the `name:arg1,arg2` string-token grammar used to reference
//!   registered middleware, groups, and aliases

#![doc(html_root_url = "https://docs.rs/strata-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod token;

pub use error::{PipelineError, PipelineResult};
pub use token::Token;

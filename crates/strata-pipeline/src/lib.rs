//! # Strata Pipeline
//!
//! Onion-model middleware pipeline engine.
//!
//! A [`Pipeline`] executes an ordered stack of middleware around a terminal
//! destination: each layer runs code before delegating to the next through a
//! [`Next`] continuation, may inspect or transform the result afterwards, and
//! may short-circuit by returning without delegating at all.
//!
//! ```text
//! Request  → layer 1 → layer 2 → ... → layer N → destination
//!                                                     ↓
//! Response ← layer 1 ← layer 2 ← ... ← layer N ←─────┘
//! ```
//!
//! ## Handler references
//!
//! The stack is heterogeneous. A [`HandlerRef`] is any of:
//!
//! | Shape | Meaning |
//! |-------|---------|
//! | `Func` | a bare async function |
//! | `Instance` | a constructed [`Middleware`] object |
//! | `Constructor` | a declared constructor, instantiated at resolution time |
//! | `Token` | `name` or `name:arg1,arg2,...` - a group, alias, or container key |
//!
//! Before execution the stack is flattened: group tokens and bare alias
//! tokens expand recursively in place (cycles fail fast); alias tokens
//! carrying arguments are kept and resolved lazily so the arguments reach
//! the aliased handler. Remaining tokens resolve through the optional
//! [`Container`] collaborator.
//!
//! ## Example
//!
//! ```ignore
//! let mut pipeline = Pipeline::with_container(container);
//! pipeline
//!     .set_aliases(aliases)
//!     .set_groups(groups)
//!     .pipe(HandlerRef::instance(Logging))
//!     .pipe("web")
//!     .pipe("check_role:admin");
//!
//! let response = pipeline
//!     .handle(request, |request| async move { Ok(render(request)) })
//!     .await?;
//! ```
//!
//! Request and response types are opaque generics; the engine passes them
//! through untouched and is runtime-agnostic - it only returns futures.

#![doc(html_root_url = "https://docs.rs/strata-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod container;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod registry;

// Re-export main types at crate root
pub use compose::{compose, Compose};
pub use config::{AliasConfig, PipelineConfig};
pub use container::Container;
pub use handler::{Constructor, DefaultConstructor, HandlerFn, HandlerRef, IntoPipe};
pub use middleware::{BoxFuture, FnMiddleware, Invocation, Middleware};
pub use pipeline::{Destination, FnDestination, Next, Pipeline};
pub use registry::{AliasTarget, Registry};
pub use strata_core::{PipelineError, PipelineResult, Token};

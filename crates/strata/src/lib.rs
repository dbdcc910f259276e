//! # Strata
//!
//! **Onion-model middleware pipeline engine**
//!
//! Strata executes an ordered stack of middleware around a terminal
//! destination: each layer runs code on the way in, delegates downward
//! through a continuation, and runs code on the way back out - or
//! short-circuits by never delegating at all.
//!
//! - **Heterogeneous stacks** - functions, middleware objects, declared
//!   constructors, and string tokens side by side
//! - **Groups and aliases** - named, recursively expanded register entries,
//!   with fail-fast cycle detection
//! - **Token arguments** - `check_role:admin` delivers `["admin"]` to the
//!   aliased middleware at invocation time
//! - **Container integration** - string keys and constructors resolve through
//!   an external collaborator consumed behind a narrow trait
//! - **Runtime-agnostic** - opaque request/response generics, no executor
//!   dependency; per-call state is call-local so shared pipelines serve
//!   concurrent invocations freely
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .pipe(HandlerRef::instance(Logging))
//!     .pipe("web")
//!     .pipe("check_role:admin");
//!
//! let response = pipeline
//!     .handle(request, |request| async move { Ok(render(request)) })
//!     .await?;
//! ```
//!
//! ## Execution model
//!
//! ```text
//! Request  → layer 1 → layer 2 → ... → layer N → destination
//!                                                     ↓
//! Response ← layer 1 ← layer 2 ← ... ← layer N ←─────┘
//! ```

#![doc(html_root_url = "https://docs.rs/strata/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use strata_core as core;

// Re-export the pipeline engine
pub use strata_pipeline as pipeline;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use strata::prelude::*;
/// ```
pub mod prelude {
    pub use strata_core::{PipelineError, PipelineResult, Token};

    pub use strata_pipeline::{
        compose, AliasConfig, AliasTarget, BoxFuture, Compose, Constructor, Container,
        DefaultConstructor, Destination, FnDestination, FnMiddleware, HandlerRef, IntoPipe,
        Invocation, Middleware, Next, Pipeline, PipelineConfig,
    };
}

//! Core middleware trait and invocation types.
//!
//! This module defines the [`Middleware`] trait implemented by every layer of
//! the onion. Middleware runs code before delegating to the rest of the chain
//! through [`Next`], may inspect or transform the result afterwards, and may
//! short-circuit by returning without running `next` at all.
//!
//! # Example
//!
//! ```ignore
//! use strata_pipeline::{BoxFuture, Invocation, Middleware, Next, PipelineResult};
//!
//! struct Logging;
//!
//! impl Middleware<Request, Response> for Logging {
//!     fn handle<'a>(
//!         &'a self,
//!         request: Request,
//!         next: Next<'a, Request, Response>,
//!         _invocation: Invocation<'a, Response>,
//!     ) -> BoxFuture<'a, PipelineResult<Response>> {
//!         Box::pin(async move {
//!             tracing::debug!("request entering");
//!             let response = next.run(request).await?;
//!             tracing::debug!("response leaving");
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

use crate::pipeline::Next;
use std::future::Future;
use std::pin::Pin;
use strata_core::PipelineResult;

/// A boxed future bounded by the borrow it was created from.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One layer of the onion.
///
/// The request flows in, `next` continues to the layer below (and ultimately
/// the destination), and the response flows back out. Middleware that never
/// runs `next` short-circuits the chain: nothing below it executes and its
/// return value becomes the final result.
///
/// # Invariants
///
/// - Code before `next.run` executes strictly before any deeper layer begins;
///   code after it executes strictly after everything deeper has settled.
/// - `next` is consumed by `run`. [`Next`] is `Copy`, so a middleware that
///   deliberately re-enters the downstream chain can copy it first; the
///   engine does not guard against re-entry.
pub trait Middleware<Rq, Rs>: Send + Sync {
    /// Processes the request through this layer.
    ///
    /// `invocation` carries the per-position call context: the optional extra
    /// value threaded through the whole chain, and the arguments parsed from
    /// this layer's token (empty unless the layer was referenced as
    /// `name:arg1,arg2,...`).
    fn handle<'a>(
        &'a self,
        request: Rq,
        next: Next<'a, Rq, Rs>,
        invocation: Invocation<'a, Rs>,
    ) -> BoxFuture<'a, PipelineResult<Rs>>;

    /// A label for logging and diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Per-position call context handed to a middleware.
///
/// All fields are borrows scoped to the invocation; the struct is `Copy`.
pub struct Invocation<'a, Rs> {
    pub(crate) extra: Option<&'a Rs>,
    pub(crate) args: &'a [String],
}

impl<'a, Rs> Invocation<'a, Rs> {
    /// The optional extra value supplied to `handle_with`, shared read-only
    /// by every layer and the destination.
    #[must_use]
    pub fn extra(&self) -> Option<&'a Rs> {
        self.extra
    }

    /// Arguments parsed from this layer's string token, verbatim.
    #[must_use]
    pub fn args(&self) -> &'a [String] {
        self.args
    }

    /// A single argument by position.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).map(String::as_str)
    }
}

impl<Rs> Clone for Invocation<'_, Rs> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Rs> Copy for Invocation<'_, Rs> {}

impl<Rs> std::fmt::Debug for Invocation<'_, Rs> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("has_extra", &self.extra.is_some())
            .field("args", &self.args)
            .finish()
    }
}

/// A middleware created from a plain async function.
///
/// This lets `fn` items participate in the pipeline without a dedicated
/// struct. The function receives the same triple as [`Middleware::handle`].
///
/// ```ignore
/// fn timing<'a>(req: Request, next: Next<'a, Request, Response>, _inv: Invocation<'a, Response>)
///     -> BoxFuture<'a, PipelineResult<Response>>
/// {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         let response = next.run(req).await;
///         tracing::debug!(elapsed = ?start.elapsed(), "request finished");
///         response
///     })
/// }
///
/// let middleware = FnMiddleware::new("timing", timing);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Rq, Rs> Middleware<Rq, Rs> for FnMiddleware<F>
where
    F: for<'a> Fn(Rq, Next<'a, Rq, Rs>, Invocation<'a, Rs>) -> BoxFuture<'a, PipelineResult<Rs>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        request: Rq,
        next: Next<'a, Rq, Rs>,
        invocation: Invocation<'a, Rs>,
    ) -> BoxFuture<'a, PipelineResult<Rs>> {
        (self.func)(request, next, invocation)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerRef;
    use crate::pipeline::Pipeline;

    type Request = Vec<String>;
    type Response = Vec<String>;

    fn tag<'a>(
        mut request: Request,
        next: Next<'a, Request, Response>,
        _invocation: Invocation<'a, Response>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            request.push("fn".to_string());
            next.run(request).await
        })
    }

    #[test]
    fn test_fn_middleware_name() {
        let middleware = FnMiddleware::new("timing", tag);
        assert_eq!(middleware.name(), "timing");
    }

    #[test]
    fn test_default_name_is_type_name() {
        struct Passthrough;

        impl Middleware<Request, Response> for Passthrough {
            fn handle<'a>(
                &'a self,
                request: Request,
                next: Next<'a, Request, Response>,
                _invocation: Invocation<'a, Response>,
            ) -> BoxFuture<'a, PipelineResult<Response>> {
                Box::pin(next.run(request))
            }
        }

        let middleware = Passthrough;
        assert!(middleware.name().contains("Passthrough"));
    }

    #[tokio::test]
    async fn test_fn_middleware_runs_in_chain() {
        let mut pipeline = Pipeline::new();
        pipeline.pipe(HandlerRef::instance(FnMiddleware::new("tag", tag)));

        let response = pipeline
            .handle(Vec::new(), |request: Request| async move { Ok(request) })
            .await
            .expect("chain should succeed");

        assert_eq!(response, vec!["fn".to_string()]);
    }
}

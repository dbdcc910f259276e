//! Composing a handler list into a single middleware.
//!
//! [`compose`] folds an ordered list of handler references into one
//! [`Middleware`]: when the composite runs, an inner pipeline executes the
//! list in order and the outer continuation serves as the inner destination.
//! Nesting composites preserves onion ordering throughout.

use crate::handler::HandlerRef;
use crate::middleware::{BoxFuture, Invocation, Middleware};
use crate::pipeline::{Destination, Next, Pipeline};
use strata_core::PipelineResult;

/// Composes handler references into a single middleware.
///
/// ```ignore
/// let combined = compose(vec![
///     HandlerRef::instance(Logging),
///     HandlerRef::token("throttle:60"),
/// ]);
/// outer.pipe(HandlerRef::instance(combined));
/// ```
pub fn compose<Rq, Rs>(handlers: Vec<HandlerRef<Rq, Rs>>) -> Compose<Rq, Rs> {
    let mut pipeline = Pipeline::new();
    pipeline.pipe(handlers);
    Compose { pipeline }
}

/// A middleware wrapping an inner pipeline.
///
/// Created by [`compose`]; [`Compose::from_pipeline`] wraps a fully
/// configured pipeline instead (registries, container) when the composed
/// handlers use tokens.
pub struct Compose<Rq, Rs> {
    pipeline: Pipeline<Rq, Rs>,
}

impl<Rq, Rs> Compose<Rq, Rs> {
    /// Wraps an already configured pipeline.
    #[must_use]
    pub fn from_pipeline(pipeline: Pipeline<Rq, Rs>) -> Self {
        Self { pipeline }
    }
}

impl<Rq, Rs> Middleware<Rq, Rs> for Compose<Rq, Rs>
where
    Rq: Send + 'static,
    Rs: Send + Sync + 'static,
{
    fn handle<'a>(
        &'a self,
        request: Rq,
        next: Next<'a, Rq, Rs>,
        invocation: Invocation<'a, Rs>,
    ) -> BoxFuture<'a, PipelineResult<Rs>> {
        Box::pin(async move {
            let relay = Relay { next };
            self.pipeline
                .dispatch(request, &relay, invocation.extra())
                .await
        })
    }

    fn name(&self) -> &'static str {
        "compose"
    }
}

/// Destination that continues the outer chain.
struct Relay<'n, Rq, Rs> {
    next: Next<'n, Rq, Rs>,
}

impl<Rq, Rs> Destination<Rq, Rs> for Relay<'_, Rq, Rs>
where
    Rq: Send + 'static,
    Rs: Send + Sync + 'static,
{
    fn dispatch<'a>(&'a self, request: Rq, _extra: Option<&'a Rs>) -> BoxFuture<'a, PipelineResult<Rs>> {
        let next = self.next;
        Box::pin(next.run(request))
    }
}

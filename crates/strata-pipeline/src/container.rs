//! The capability-resolution collaborator.
//!
//! The pipeline never resolves string bindings or constructs dependencies
//! itself; it consumes an external container through the narrow [`Container`]
//! trait and treats everything behind it as opaque. Implementations are
//! expected to be task-safe: the pipeline may probe and resolve from
//! concurrent invocations.

use crate::handler::Constructor;
use crate::middleware::Middleware;
use std::sync::Arc;

/// An external component able to look up or construct middleware.
///
/// Two of the three operations concern string tokens: [`Container::has`] is
/// the membership probe, [`Container::make`] resolves a known key into a
/// middleware instance. [`Container::construct`] is consulted for declared
/// constructors so the collaborator can supply the middleware's own
/// dependencies; the default implementation falls back to zero-argument
/// construction.
///
/// Resolution happens lazily, once per invocation per chain position, so a
/// binding whose instances vary between calls behaves as the container
/// decides - the pipeline caches nothing across calls.
pub trait Container<Rq, Rs>: Send + Sync {
    /// Reports whether the container knows the key.
    fn has(&self, key: &str) -> bool;

    /// Resolves a known key into a middleware instance.
    ///
    /// Returning `None` for a key that [`Container::has`] reported is treated
    /// as an unknown handler by the pipeline.
    fn make(&self, key: &str) -> Option<Arc<dyn Middleware<Rq, Rs>>>;

    /// Constructs middleware from a declared constructor.
    fn construct(&self, constructor: &dyn Constructor<Rq, Rs>) -> Arc<dyn Middleware<Rq, Rs>> {
        constructor.construct()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::DefaultConstructor;
    use crate::middleware::{BoxFuture, Invocation};
    use crate::pipeline::Next;
    use strata_core::PipelineResult;

    type Request = Vec<String>;
    type Response = Vec<String>;

    #[derive(Default)]
    struct Probe;

    impl Middleware<Request, Response> for Probe {
        fn handle<'a>(
            &'a self,
            request: Request,
            next: Next<'a, Request, Response>,
            _invocation: Invocation<'a, Response>,
        ) -> BoxFuture<'a, PipelineResult<Response>> {
            Box::pin(next.run(request))
        }
    }

    struct EmptyContainer;

    impl Container<Request, Response> for EmptyContainer {
        fn has(&self, _key: &str) -> bool {
            false
        }

        fn make(&self, _key: &str) -> Option<Arc<dyn Middleware<Request, Response>>> {
            None
        }
    }

    #[test]
    fn test_default_construct_falls_back_to_constructor() {
        let container = EmptyContainer;
        let constructor = DefaultConstructor::<Probe>::new();
        let middleware = container.construct(&constructor);
        assert!(middleware.name().contains("Probe"));
    }
}

//! The pipeline: resolution and onion invocation.
//!
//! A [`Pipeline`] owns an append-only stack of handler references, the
//! group/alias registries, and an optional container. Each call to
//! [`Pipeline::handle`] flattens the stack into a concrete chain, then walks
//! it by index: every position is resolved lazily into an invocable, called
//! with the request and a [`Next`] continuation closed over the following
//! index, and the chain unwinds back through each layer in reverse order once
//! the destination (or a short-circuiting layer) produces a result.
//!
//! All per-call state - the flattened chain, the index cursor, resolved
//! arguments, the extra value - lives on the call's own stack, so concurrent
//! invocations on one shared pipeline never interfere.
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .pipe(HandlerRef::instance(Logging))
//!     .pipe("throttle:60");
//!
//! let response = pipeline
//!     .handle(request, |request| async move { Ok(Response::from(request)) })
//!     .await?;
//! ```

use crate::container::Container;
use crate::handler::{HandlerFn, HandlerRef, IntoPipe};
use crate::middleware::{BoxFuture, Invocation, Middleware};
use crate::registry::{AliasTarget, Registry};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use strata_core::{PipelineError, PipelineResult, Token};

/// An onion-model middleware pipeline.
///
/// Configuration (`pipe`, `set_groups`, `set_aliases`) takes `&mut self`;
/// invocation takes `&self`. A pipeline is therefore configured first and
/// then shared freely - the borrow checker rules out mutation concurrent
/// with in-flight calls.
pub struct Pipeline<Rq, Rs> {
    stack: Vec<HandlerRef<Rq, Rs>>,
    registry: Registry<Rq, Rs>,
    container: Option<Arc<dyn Container<Rq, Rs>>>,
}

impl<Rq, Rs> Pipeline<Rq, Rs> {
    /// Creates an empty pipeline with no container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            registry: Registry::new(),
            container: None,
        }
    }

    /// Creates an empty pipeline backed by a container.
    #[must_use]
    pub fn with_container(container: Arc<dyn Container<Rq, Rs>>) -> Self {
        Self {
            stack: Vec::new(),
            registry: Registry::new(),
            container: Some(container),
        }
    }

    /// Appends a handler reference (or a list of them) to the stack.
    ///
    /// Order-preserving and repeatable; the stack is never reordered and
    /// entries are never removed.
    pub fn pipe(&mut self, handler: impl IntoPipe<Rq, Rs>) -> &mut Self {
        self.stack.extend(handler.into_pipe());
        self
    }

    /// Installs the group registry.
    ///
    /// Intended to be called at most once, before the first `handle`.
    pub fn set_groups(&mut self, groups: HashMap<String, Vec<HandlerRef<Rq, Rs>>>) -> &mut Self {
        self.registry.set_groups(groups);
        self
    }

    /// Installs the alias registry.
    ///
    /// Intended to be called at most once, before the first `handle`.
    pub fn set_aliases(&mut self, aliases: HashMap<String, AliasTarget<Rq, Rs>>) -> &mut Self {
        self.registry.set_aliases(aliases);
        self
    }

    /// The number of raw (unflattened) handler references piped so far.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.stack.len()
    }
}

impl<Rq, Rs> Default for Pipeline<Rq, Rs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Rq, Rs> Pipeline<Rq, Rs>
where
    Rq: Send + 'static,
    Rs: Send + Sync + 'static,
{
    /// Runs the pipeline through the given destination.
    ///
    /// The destination is the innermost call, invoked once the chain is
    /// exhausted. A middleware that never runs its continuation
    /// short-circuits and the destination is never reached.
    ///
    /// # Errors
    ///
    /// Resolution failures ([`PipelineError::UnknownHandler`],
    /// [`PipelineError::CircularReference`], [`PipelineError::GroupAlias`])
    /// abort the chain immediately; failures from middleware or the
    /// destination propagate untranslated.
    pub async fn handle<F, Fut>(&self, request: Rq, destination: F) -> PipelineResult<Rs>
    where
        F: Fn(Rq) -> Fut + Send + Sync,
        Fut: Future<Output = PipelineResult<Rs>> + Send + 'static,
    {
        self.dispatch(request, &FnDestination::new(destination), None)
            .await
    }

    /// Runs the pipeline with an extra value threaded through the chain.
    ///
    /// Every layer observes the value through
    /// [`Invocation::extra`](crate::middleware::Invocation::extra); the
    /// destination receives it through [`Destination::dispatch`].
    pub async fn handle_with<F, Fut>(
        &self,
        request: Rq,
        destination: F,
        extra: Rs,
    ) -> PipelineResult<Rs>
    where
        F: Fn(Rq) -> Fut + Send + Sync,
        Fut: Future<Output = PipelineResult<Rs>> + Send + 'static,
    {
        self.dispatch(request, &FnDestination::new(destination), Some(&extra))
            .await
    }

    /// Runs the pipeline through a [`Destination`] implementation.
    ///
    /// This is the trait-based entry point behind `handle`/`handle_with`,
    /// for destinations that need the extra value or re-entry.
    pub async fn dispatch(
        &self,
        request: Rq,
        destination: &dyn Destination<Rq, Rs>,
        extra: Option<&Rs>,
    ) -> PipelineResult<Rs> {
        let chain = self.registry.flatten(&self.stack)?;
        tracing::debug!(handlers = chain.len(), "middleware chain flattened");
        invoke(self, &chain, 0, request, destination, extra).await
    }

    /// Resolves one flattened reference into an invocable plus its arguments.
    ///
    /// Performed lazily, once per invocation per chain position, so stateful
    /// container bindings can vary between calls.
    fn resolve(&self, reference: &HandlerRef<Rq, Rs>) -> PipelineResult<Resolved<Rq, Rs>> {
        let mut trail = Vec::new();
        self.resolve_inner(reference, &mut trail)
    }

    fn resolve_inner(
        &self,
        reference: &HandlerRef<Rq, Rs>,
        trail: &mut Vec<String>,
    ) -> PipelineResult<Resolved<Rq, Rs>> {
        match reference {
            HandlerRef::Func(func) => Ok(Resolved::bare(Invocable::Func(Arc::clone(func)))),
            HandlerRef::Instance(instance) => {
                Ok(Resolved::bare(Invocable::Object(Arc::clone(instance))))
            }
            HandlerRef::Constructor(constructor) => {
                let built = match &self.container {
                    Some(container) => container.construct(constructor.as_ref()),
                    None => constructor.construct(),
                };
                tracing::trace!(middleware = constructor.target(), "middleware constructed");
                Ok(Resolved::bare(Invocable::Object(built)))
            }
            HandlerRef::Token(raw) => self.resolve_token(raw, trail),
        }
    }

    fn resolve_token(
        &self,
        raw: &str,
        trail: &mut Vec<String>,
    ) -> PipelineResult<Resolved<Rq, Rs>> {
        let token = Token::parse(raw);

        if let Some(target) = self.registry.alias(token.name) {
            if trail.iter().any(|seen| seen == token.name) {
                return Err(PipelineError::circular_reference(token.name));
            }
            let single = match target {
                AliasTarget::Single(reference) => reference,
                AliasTarget::List(_) => return Err(PipelineError::group_alias(token.name)),
            };
            trail.push(token.name.to_string());
            let mut resolved = self.resolve_inner(single, trail)?;
            trail.pop();
            // The outermost argument list wins over anything the alias
            // target carried itself.
            if token.has_args() {
                resolved.args = token.owned_args();
            }
            return Ok(resolved);
        }

        if let Some(container) = &self.container {
            if container.has(token.name) {
                if let Some(made) = container.make(token.name) {
                    tracing::trace!(key = token.name, "middleware resolved from container");
                    return Ok(Resolved {
                        target: Invocable::Object(made),
                        args: token.owned_args(),
                    });
                }
            }
        }

        tracing::debug!(key = token.name, "middleware token did not resolve");
        Err(PipelineError::unknown_handler(token.name))
    }
}

/// A resolved chain position: the invocable and its parsed arguments.
struct Resolved<Rq, Rs> {
    target: Invocable<Rq, Rs>,
    args: Vec<String>,
}

impl<Rq, Rs> Resolved<Rq, Rs> {
    fn bare(target: Invocable<Rq, Rs>) -> Self {
        Self {
            target,
            args: Vec::new(),
        }
    }
}

enum Invocable<Rq, Rs> {
    Func(Arc<HandlerFn<Rq, Rs>>),
    Object(Arc<dyn Middleware<Rq, Rs>>),
}

/// The terminal continuation of a chain.
///
/// [`Pipeline::handle`] wraps a plain closure for the common case; implement
/// this trait directly when the destination needs the extra value.
pub trait Destination<Rq, Rs>: Send + Sync {
    /// Produces the innermost result for the (possibly transformed) request.
    fn dispatch<'a>(&'a self, request: Rq, extra: Option<&'a Rs>) -> BoxFuture<'a, PipelineResult<Rs>>;
}

/// A destination created from a plain async closure that ignores the extra
/// value.
pub struct FnDestination<F> {
    func: F,
}

impl<F> FnDestination<F> {
    /// Wraps the closure.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut, Rq, Rs> Destination<Rq, Rs> for FnDestination<F>
where
    F: Fn(Rq) -> Fut + Send + Sync,
    Fut: Future<Output = PipelineResult<Rs>> + Send + 'static,
{
    fn dispatch<'a>(&'a self, request: Rq, _extra: Option<&'a Rs>) -> BoxFuture<'a, PipelineResult<Rs>> {
        Box::pin((self.func)(request))
    }
}

/// Continuation into the rest of the chain.
///
/// Passed to every middleware; running it advances to the next position (or
/// the destination) with the possibly transformed request. `run` consumes the
/// continuation, and `Next` is `Copy`: a middleware that wants to re-enter
/// the downstream chain copies it before running.
pub struct Next<'a, Rq, Rs> {
    pipeline: &'a Pipeline<Rq, Rs>,
    chain: &'a [HandlerRef<Rq, Rs>],
    index: usize,
    destination: &'a (dyn Destination<Rq, Rs> + 'a),
    extra: Option<&'a Rs>,
}

impl<Rq, Rs> Clone for Next<'_, Rq, Rs> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Rq, Rs> Copy for Next<'_, Rq, Rs> {}

impl<'a, Rq, Rs> Next<'a, Rq, Rs>
where
    Rq: Send + 'static,
    Rs: Send + Sync + 'static,
{
    /// Advances into the next chain position.
    pub async fn run(self, request: Rq) -> PipelineResult<Rs> {
        invoke(
            self.pipeline,
            self.chain,
            self.index,
            request,
            self.destination,
            self.extra,
        )
        .await
    }
}

// Index-based recursion over the flattened chain; boxed so the recursive
// async type stays finite.
fn invoke<'a, Rq, Rs>(
    pipeline: &'a Pipeline<Rq, Rs>,
    chain: &'a [HandlerRef<Rq, Rs>],
    index: usize,
    request: Rq,
    destination: &'a (dyn Destination<Rq, Rs> + 'a),
    extra: Option<&'a Rs>,
) -> BoxFuture<'a, PipelineResult<Rs>>
where
    Rq: Send + 'static,
    Rs: Send + Sync + 'static,
{
    Box::pin(async move {
        let Some(reference) = chain.get(index) else {
            return destination.dispatch(request, extra).await;
        };

        let resolved = pipeline.resolve(reference)?;
        let next = Next {
            pipeline,
            chain,
            index: index + 1,
            destination,
            extra,
        };
        let invocation = Invocation {
            extra,
            args: &resolved.args,
        };

        match &resolved.target {
            Invocable::Func(func) => (func.as_ref())(request, next, invocation).await,
            Invocable::Object(object) => object.handle(request, next, invocation).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Request = Vec<String>;
    type Response = Vec<String>;

    /// Marker middleware: records entry into the request and exit into the
    /// response as it travels back out.
    struct Tag {
        label: &'static str,
    }

    impl Middleware<Request, Response> for Tag {
        fn handle<'a>(
            &'a self,
            mut request: Request,
            next: Next<'a, Request, Response>,
            _invocation: Invocation<'a, Response>,
        ) -> BoxFuture<'a, PipelineResult<Response>> {
            Box::pin(async move {
                request.push(format!("start {}", self.label));
                let mut response = next.run(request).await?;
                response.push(format!("end {}", self.label));
                Ok(response)
            })
        }
    }

    async fn destination(mut request: Request) -> PipelineResult<Response> {
        request.push("destination".to_string());
        Ok(request)
    }

    #[tokio::test]
    async fn test_onion_ordering() {
        let mut pipeline = Pipeline::new();
        pipeline
            .pipe(HandlerRef::instance(Tag { label: "1" }))
            .pipe(HandlerRef::instance(Tag { label: "2" }));

        let response = pipeline.handle(Vec::new(), destination).await.unwrap();
        assert_eq!(
            response,
            vec!["start 1", "start 2", "destination", "end 2", "end 1"]
        );
    }

    #[tokio::test]
    async fn test_empty_stack_goes_straight_to_destination() {
        let pipeline: Pipeline<Request, Response> = Pipeline::new();
        let response = pipeline.handle(Vec::new(), destination).await.unwrap();
        assert_eq!(response, vec!["destination"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        struct Gate;

        impl Middleware<Request, Response> for Gate {
            fn handle<'a>(
                &'a self,
                _request: Request,
                _next: Next<'a, Request, Response>,
                _invocation: Invocation<'a, Response>,
            ) -> BoxFuture<'a, PipelineResult<Response>> {
                Box::pin(async move { Ok(vec!["denied".to_string()]) })
            }
        }

        let mut pipeline = Pipeline::new();
        pipeline
            .pipe(HandlerRef::instance(Gate))
            .pipe(HandlerRef::instance(Tag { label: "unreachable" }));

        let response = pipeline.handle(Vec::new(), destination).await.unwrap();
        assert_eq!(response, vec!["denied"]);
    }

    #[tokio::test]
    async fn test_unknown_token_fails_without_container() {
        let mut pipeline: Pipeline<Request, Response> = Pipeline::new();
        pipeline.pipe("missing");

        let err = pipeline.handle(Vec::new(), destination).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownHandler { ref key } if key == "missing"));
    }

    #[tokio::test]
    async fn test_container_resolves_known_key() {
        struct TestContainer;

        impl Container<Request, Response> for TestContainer {
            fn has(&self, key: &str) -> bool {
                key == "auth"
            }

            fn make(&self, key: &str) -> Option<Arc<dyn Middleware<Request, Response>>> {
                if key == "auth" {
                    Some(Arc::new(Tag { label: "auth" }))
                } else {
                    None
                }
            }
        }

        let mut pipeline = Pipeline::with_container(Arc::new(TestContainer));
        pipeline.pipe("auth");

        let response = pipeline.handle(Vec::new(), destination).await.unwrap();
        assert_eq!(response, vec!["start auth", "destination", "end auth"]);
    }

    #[tokio::test]
    async fn test_container_probe_miss_is_unknown() {
        struct EmptyContainer;

        impl Container<Request, Response> for EmptyContainer {
            fn has(&self, _key: &str) -> bool {
                false
            }

            fn make(&self, _key: &str) -> Option<Arc<dyn Middleware<Request, Response>>> {
                None
            }
        }

        let mut pipeline = Pipeline::with_container(Arc::new(EmptyContainer));
        pipeline.pipe("auth");

        let err = pipeline.handle(Vec::new(), destination).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownHandler { .. }));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates() {
        struct Failing;

        impl Middleware<Request, Response> for Failing {
            fn handle<'a>(
                &'a self,
                _request: Request,
                _next: Next<'a, Request, Response>,
                _invocation: Invocation<'a, Response>,
            ) -> BoxFuture<'a, PipelineResult<Response>> {
                Box::pin(async move { Err(PipelineError::handler("boom")) })
            }
        }

        let mut pipeline = Pipeline::new();
        pipeline.pipe(HandlerRef::instance(Failing));

        let err = pipeline.handle(Vec::new(), destination).await.unwrap_err();
        assert!(matches!(err, PipelineError::Handler(_)));
    }

    #[tokio::test]
    async fn test_extra_value_reaches_layers_and_not_fn_destination() {
        struct ExtraReader;

        impl Middleware<Request, Response> for ExtraReader {
            fn handle<'a>(
                &'a self,
                mut request: Request,
                next: Next<'a, Request, Response>,
                invocation: Invocation<'a, Response>,
            ) -> BoxFuture<'a, PipelineResult<Response>> {
                Box::pin(async move {
                    let seen = invocation
                        .extra()
                        .map_or("none".to_string(), |extra| extra.join("+"));
                    request.push(format!("extra:{seen}"));
                    next.run(request).await
                })
            }
        }

        let mut pipeline = Pipeline::new();
        pipeline.pipe(HandlerRef::instance(ExtraReader));

        let response = pipeline
            .handle_with(Vec::new(), destination, vec!["seed".to_string()])
            .await
            .unwrap();
        assert_eq!(response, vec!["extra:seed", "destination"]);
    }

    #[tokio::test]
    async fn test_double_advance_reenters_downstream() {
        struct Twice;

        impl Middleware<Request, Response> for Twice {
            fn handle<'a>(
                &'a self,
                request: Request,
                next: Next<'a, Request, Response>,
                _invocation: Invocation<'a, Response>,
            ) -> BoxFuture<'a, PipelineResult<Response>> {
                Box::pin(async move {
                    let again = next;
                    let first = next.run(request).await?;
                    again.run(first).await
                })
            }
        }

        let mut pipeline = Pipeline::new();
        pipeline.pipe(HandlerRef::instance(Twice));

        let response = pipeline.handle(Vec::new(), destination).await.unwrap();
        assert_eq!(response, vec!["destination", "destination"]);
    }

    #[tokio::test]
    async fn test_resolution_is_lazy_per_invocation() {
        struct Counting {
            made: Arc<Mutex<usize>>,
        }

        impl Container<Request, Response> for Counting {
            fn has(&self, key: &str) -> bool {
                key == "auth"
            }

            fn make(&self, _key: &str) -> Option<Arc<dyn Middleware<Request, Response>>> {
                *self.made.lock().unwrap() += 1;
                Some(Arc::new(Tag { label: "auth" }))
            }
        }

        let made = Arc::new(Mutex::new(0));
        let mut pipeline = Pipeline::with_container(Arc::new(Counting { made: made.clone() }));
        pipeline.pipe("auth");

        pipeline.handle(Vec::new(), destination).await.unwrap();
        pipeline.handle(Vec::new(), destination).await.unwrap();

        // One make per invocation - nothing cached across calls.
        assert_eq!(*made.lock().unwrap(), 2);
    }
}

//! Handler references.
//!
//! A [`HandlerRef`] is the raw value a caller places in the pipeline stack.
//! The four accepted shapes are modeled as a closed tagged union so the
//! engine never sniffs the shape of a dynamic value at run time:
//!
//! - [`HandlerRef::Func`] - a bare async function
//! - [`HandlerRef::Instance`] - an already-constructed middleware object
//! - [`HandlerRef::Constructor`] - a declared constructor, instantiated at
//!   resolution time (by the container when one is configured)
//! - [`HandlerRef::Token`] - a string naming a group, an alias, or a
//!   container binding, optionally carrying `:`-delimited arguments

use crate::middleware::{BoxFuture, Invocation, Middleware};
use crate::pipeline::Next;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_core::PipelineResult;

/// The signature of a bare-function handler.
///
/// Same triple as [`Middleware::handle`], without the receiver.
pub type HandlerFn<Rq, Rs> = dyn for<'a> Fn(
        Rq,
        Next<'a, Rq, Rs>,
        Invocation<'a, Rs>,
    ) -> BoxFuture<'a, PipelineResult<Rs>>
    + Send
    + Sync;

/// A raw handler reference in the pipeline stack.
pub enum HandlerRef<Rq, Rs> {
    /// A bare async function with the handler signature.
    Func(Arc<HandlerFn<Rq, Rs>>),
    /// An already-constructed middleware object.
    Instance(Arc<dyn Middleware<Rq, Rs>>),
    /// A deferred constructor; instantiated once per resolution, preferring
    /// the container when one is configured.
    Constructor(Arc<dyn Constructor<Rq, Rs>>),
    /// A string token: `name` or `name:arg1,arg2,...`.
    Token(String),
}

impl<Rq, Rs> HandlerRef<Rq, Rs> {
    /// Wraps a bare async function.
    pub fn func<F>(func: F) -> Self
    where
        F: for<'a> Fn(Rq, Next<'a, Rq, Rs>, Invocation<'a, Rs>) -> BoxFuture<'a, PipelineResult<Rs>>
            + Send
            + Sync
            + 'static,
    {
        Self::Func(Arc::new(func))
    }

    /// Wraps a constructed middleware object.
    pub fn instance<M>(middleware: M) -> Self
    where
        M: Middleware<Rq, Rs> + 'static,
    {
        Self::Instance(Arc::new(middleware))
    }

    /// Wraps an already-shared middleware object.
    pub fn shared(middleware: Arc<dyn Middleware<Rq, Rs>>) -> Self {
        Self::Instance(middleware)
    }

    /// Declares a deferred constructor.
    pub fn constructor<C>(constructor: C) -> Self
    where
        C: Constructor<Rq, Rs> + 'static,
    {
        Self::Constructor(Arc::new(constructor))
    }

    /// References a middleware by string token.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }
}

impl<Rq, Rs> Clone for HandlerRef<Rq, Rs> {
    fn clone(&self) -> Self {
        match self {
            Self::Func(func) => Self::Func(Arc::clone(func)),
            Self::Instance(instance) => Self::Instance(Arc::clone(instance)),
            Self::Constructor(constructor) => Self::Constructor(Arc::clone(constructor)),
            Self::Token(token) => Self::Token(token.clone()),
        }
    }
}

// Not derivable: the function and middleware variants hold type-erased values.
impl<Rq, Rs> fmt::Debug for HandlerRef<Rq, Rs> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Func(_) => f.write_str("HandlerRef::Func"),
            Self::Instance(instance) => {
                f.debug_tuple("HandlerRef::Instance").field(&instance.name()).finish()
            }
            Self::Constructor(constructor) => {
                f.debug_tuple("HandlerRef::Constructor").field(&constructor.target()).finish()
            }
            Self::Token(token) => f.debug_tuple("HandlerRef::Token").field(token).finish(),
        }
    }
}

impl<Rq, Rs> From<&str> for HandlerRef<Rq, Rs> {
    fn from(token: &str) -> Self {
        Self::token(token)
    }
}

impl<Rq, Rs> From<String> for HandlerRef<Rq, Rs> {
    fn from(token: String) -> Self {
        Self::token(token)
    }
}

/// A declared middleware constructor.
///
/// This replaces structural "is this a class" detection: callers that want a
/// middleware instantiated at resolution time say so by registering a
/// constructor. When the pipeline has a [`Container`](crate::container::Container),
/// construction is
/// delegated to it so the middleware's own dependencies can be supplied;
/// otherwise [`Constructor::construct`] runs directly with no arguments.
pub trait Constructor<Rq, Rs>: Send + Sync {
    /// Constructs the middleware with no external dependencies.
    fn construct(&self) -> Arc<dyn Middleware<Rq, Rs>>;

    /// The name of the constructed type, for diagnostics.
    fn target(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A constructor for middleware with a `Default` implementation.
///
/// ```ignore
/// pipeline.pipe(HandlerRef::constructor(DefaultConstructor::<RateLimit>::new()));
/// ```
pub struct DefaultConstructor<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> DefaultConstructor<M> {
    /// Creates the constructor.
    #[must_use]
    pub const fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<M> Default for DefaultConstructor<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, Rq, Rs> Constructor<Rq, Rs> for DefaultConstructor<M>
where
    M: Middleware<Rq, Rs> + Default + 'static,
{
    fn construct(&self) -> Arc<dyn Middleware<Rq, Rs>> {
        Arc::new(M::default())
    }

    fn target(&self) -> &'static str {
        std::any::type_name::<M>()
    }
}

/// Conversion into a list of handler references for [`crate::Pipeline::pipe`].
///
/// Lets `pipe` accept a single reference, a list, or a bare token string.
pub trait IntoPipe<Rq, Rs> {
    /// Converts into the references to append, in order.
    fn into_pipe(self) -> Vec<HandlerRef<Rq, Rs>>;
}

impl<Rq, Rs> IntoPipe<Rq, Rs> for HandlerRef<Rq, Rs> {
    fn into_pipe(self) -> Vec<HandlerRef<Rq, Rs>> {
        vec![self]
    }
}

impl<Rq, Rs> IntoPipe<Rq, Rs> for Vec<HandlerRef<Rq, Rs>> {
    fn into_pipe(self) -> Vec<HandlerRef<Rq, Rs>> {
        self
    }
}

impl<Rq, Rs> IntoPipe<Rq, Rs> for &str {
    fn into_pipe(self) -> Vec<HandlerRef<Rq, Rs>> {
        vec![HandlerRef::token(self)]
    }
}

impl<Rq, Rs> IntoPipe<Rq, Rs> for String {
    fn into_pipe(self) -> Vec<HandlerRef<Rq, Rs>> {
        vec![HandlerRef::token(self)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Request = Vec<String>;
    type Response = Vec<String>;

    #[derive(Default)]
    struct Probe;

    impl Middleware<Request, Response> for Probe {
        fn handle<'a>(
            &'a self,
            mut request: Request,
            next: Next<'a, Request, Response>,
            _invocation: Invocation<'a, Response>,
        ) -> BoxFuture<'a, PipelineResult<Response>> {
            Box::pin(async move {
                request.push("probe".to_string());
                next.run(request).await
            })
        }
    }

    #[test]
    fn test_token_from_str() {
        let reference: HandlerRef<Request, Response> = "auth:basic".into();
        assert!(matches!(reference, HandlerRef::Token(ref t) if t == "auth:basic"));
    }

    #[test]
    fn test_debug_formatting() {
        let token: HandlerRef<Request, Response> = HandlerRef::token("web");
        assert_eq!(format!("{token:?}"), "HandlerRef::Token(\"web\")");

        let instance: HandlerRef<Request, Response> = HandlerRef::instance(Probe);
        assert!(format!("{instance:?}").contains("Probe"));
    }

    #[test]
    fn test_default_constructor_target() {
        let constructor = DefaultConstructor::<Probe>::new();
        let target = Constructor::<Request, Response>::target(&constructor);
        assert!(target.contains("Probe"));
    }

    #[test]
    fn test_default_constructor_builds() {
        let constructor = DefaultConstructor::<Probe>::new();
        let middleware: Arc<dyn Middleware<Request, Response>> = constructor.construct();
        assert!(middleware.name().contains("Probe"));
    }

    #[test]
    fn test_into_pipe_shapes() {
        let single: Vec<HandlerRef<Request, Response>> = HandlerRef::token("a").into_pipe();
        assert_eq!(single.len(), 1);

        let many: Vec<HandlerRef<Request, Response>> =
            vec![HandlerRef::token("a"), HandlerRef::token("b")].into_pipe();
        assert_eq!(many.len(), 2);

        let from_str: Vec<HandlerRef<Request, Response>> = "web".into_pipe();
        assert!(matches!(from_str[0], HandlerRef::Token(ref t) if t == "web"));
    }
}

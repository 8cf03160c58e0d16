//! Callback handlers.
//!
//! A handler receives the current values of its sources, in declaration
//! order, and returns either one value per destination or
//! [`Output::NoUpdate`]. Plain closures are adapted with the `from_*`
//! constructors:
//!
//! ```rust,ignore
//! let label = handler::from_fn1(|index| {
//!     let n = index.as_u64().unwrap_or(0) + 1;
//!     Ok(Output::one(format!("Slide {n}")))
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// One value per destination, in destination order.
    Update(Vec<Value>),
    /// Leave every destination untouched.
    NoUpdate,
}

impl Output {
    /// Update for a callback with a single destination.
    pub fn one(value: impl Into<Value>) -> Self {
        Output::Update(vec![value.into()])
    }
}

pub trait Handler: Send + Sync + 'static {
    /// Number of source values the handler expects. `None` accepts any.
    fn arity(&self) -> Option<usize>;

    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, anyhow::Result<Output>>;
}

impl Handler for Box<dyn Handler> {
    fn arity(&self) -> Option<usize> {
        (**self).arity()
    }

    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, anyhow::Result<Output>> {
        (**self).call(args)
    }
}

type BoxedFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Output>> + Send + Sync>;

/// A handler built from a closure.
#[derive(Clone)]
pub struct FnHandler {
    arity: Option<usize>,
    f: BoxedFn,
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").field("arity", &self.arity).finish_non_exhaustive()
    }
}

impl Handler for FnHandler {
    fn arity(&self) -> Option<usize> {
        self.arity
    }

    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, anyhow::Result<Output>> {
        (self.f)(args)
    }
}

fn nth(args: &mut std::vec::IntoIter<Value>) -> Value {
    args.next().unwrap_or(Value::Null)
}

/// Synchronous handler of one source.
pub fn from_fn1<F>(f: F) -> FnHandler
where
    F: Fn(Value) -> anyhow::Result<Output> + Send + Sync + 'static,
{
    FnHandler {
        arity: Some(1),
        f: Arc::new(move |args| {
            let mut args = args.into_iter();
            future::ready(f(nth(&mut args))).boxed()
        }),
    }
}

/// Synchronous handler of two sources.
pub fn from_fn2<F>(f: F) -> FnHandler
where
    F: Fn(Value, Value) -> anyhow::Result<Output> + Send + Sync + 'static,
{
    FnHandler {
        arity: Some(2),
        f: Arc::new(move |args| {
            let mut args = args.into_iter();
            let a = nth(&mut args);
            let b = nth(&mut args);
            future::ready(f(a, b)).boxed()
        }),
    }
}

/// Synchronous handler taking every source value as a slice.
pub fn from_fn_n<F>(f: F) -> FnHandler
where
    F: Fn(&[Value]) -> anyhow::Result<Output> + Send + Sync + 'static,
{
    FnHandler {
        arity: None,
        f: Arc::new(move |args| future::ready(f(&args)).boxed()),
    }
}

/// Asynchronous handler of one source.
pub fn from_async1<F, Fut>(f: F) -> FnHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Output>> + Send + 'static,
{
    FnHandler {
        arity: Some(1),
        f: Arc::new(move |args| {
            let mut args = args.into_iter();
            f(nth(&mut args)).boxed()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_handlers_receive_sources_in_order() {
        let h = from_fn2(|a, b| Ok(Output::one(format!("{a}-{b}"))));
        assert_eq!(h.arity(), Some(2));
        let out = h.call(vec![json!(1), json!("x")]).await.unwrap();
        assert_eq!(out, Output::one(r#"1-"x""#));
    }

    #[tokio::test]
    async fn missing_arguments_are_null() {
        let h = from_fn1(|v| Ok(Output::one(v.is_null())));
        assert_eq!(h.call(Vec::new()).await.unwrap(), Output::one(true));
    }

    #[tokio::test]
    async fn variadic_and_async() {
        let n = from_fn_n(|args| Ok(Output::one(args.len())));
        assert_eq!(n.arity(), None);
        assert_eq!(n.call(vec![json!(1), json!(2), json!(3)]).await.unwrap(), Output::one(3));

        let a = from_async1(|v| async move {
            tokio::task::yield_now().await;
            if v.is_null() { Ok(Output::NoUpdate) } else { anyhow::bail!("boom") }
        });
        assert_eq!(a.call(vec![Value::Null]).await.unwrap(), Output::NoUpdate);
        assert!(a.call(vec![json!(1)]).await.is_err());
    }
}

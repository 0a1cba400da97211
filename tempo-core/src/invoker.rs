use std::fmt;
use std::sync::Arc;

use crate::error::InvokeError;

/// The unit of work being timed: one logical call per `invoke`.
///
/// Arguments, if any, are part of the invoker's own state.
pub trait Invoker: Send + Sync {
    fn id(&self) -> &str;

    fn invoke(&self) -> Result<(), InvokeError>;
}

/// [`Invoker`] backed by a closure.
pub struct FnInvoker<F> {
    id: Arc<str>,
    f: F,
}

impl<F> FnInvoker<F>
where
    F: Fn() -> Result<(), InvokeError> + Send + Sync,
{
    pub fn new(id: impl Into<Arc<str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> fmt::Debug for FnInvoker<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInvoker").field("id", &self.id).finish()
    }
}

impl<F> Invoker for FnInvoker<F>
where
    F: Fn() -> Result<(), InvokeError> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn invoke(&self) -> Result<(), InvokeError> {
        (self.f)()
    }
}

/// Shorthand for an `Arc<dyn Invoker>` around a closure.
pub fn invoker<F>(id: impl Into<Arc<str>>, f: F) -> Arc<dyn Invoker>
where
    F: Fn() -> Result<(), InvokeError> + Send + Sync + 'static,
{
    Arc::new(FnInvoker::new(id, f))
}

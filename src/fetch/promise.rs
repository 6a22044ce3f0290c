//! Promise handles over spawned units of work.
//!
//! A [`Promise`] wraps the join handle of one spawned task. Awaiting it
//! yields the task's result; chaining spawns a fresh continuation unit
//! whose callback result is normalized through [`Step`], which is what
//! allows arbitrary-depth chains including sequential dependent requests.

use crate::base::error::{FetchError, TimeoutDomain};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of a `then` callback, before normalization.
pub enum Step<U> {
    /// A plain value, wrapped as success.
    Value(U),
    /// An explicit success or failure, passed through unchanged.
    Settled(Result<U, FetchError>),
    /// Another promise; awaited and its result substituted.
    Chain(Promise<U>),
}

impl<U: Send + 'static> Step<U> {
    async fn resolve(self) -> Result<U, FetchError> {
        match self {
            Step::Value(value) => Ok(value),
            Step::Settled(result) => result,
            Step::Chain(promise) => promise.wait().await,
        }
    }
}

/// A join handle over one asynchronous unit of work.
///
/// Single-owner: awaiting or chaining consumes the handle. The unit is
/// not linked to its caller - a crash inside it is observed only when the
/// result is retrieved, as [`FetchError::Crashed`].
pub struct Promise<T = crate::http::response::Response> {
    handle: JoinHandle<Result<T, FetchError>>,
}

impl<T: Send + 'static> Promise<T> {
    /// Spawn a unit of work and wrap its handle.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(work),
        }
    }

    /// A promise that is already settled.
    pub fn settled(result: Result<T, FetchError>) -> Self {
        Self::spawn(async move { result })
    }

    /// Block the calling task until the unit of work resolves.
    ///
    /// Never unwinds past this boundary: a panicked unit surfaces as
    /// [`FetchError::Crashed`], a cancelled one as [`FetchError::Aborted`].
    pub async fn wait(self) -> Result<T, FetchError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join) if join.is_cancelled() => Err(FetchError::Aborted),
            Err(join) => Err(FetchError::Crashed(join.to_string())),
        }
    }

    /// Like [`Promise::wait`], but give up after `limit`.
    ///
    /// The abandoned unit is cancelled on expiry so its outcome is still
    /// accounted for instead of leaking.
    pub async fn wait_timeout(self, limit: Duration) -> Result<T, FetchError> {
        let mut handle = self.handle;
        match tokio::time::timeout(limit, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_cancelled() => Err(FetchError::Aborted),
            Ok(Err(join)) => Err(FetchError::Crashed(join.to_string())),
            Err(_) => {
                handle.abort();
                Err(FetchError::Timeout {
                    domain: TimeoutDomain::Await,
                    after: limit,
                })
            }
        }
    }

    /// Cancel the underlying unit of work. A later `wait` observes
    /// [`FetchError::Aborted`].
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Chain a continuation onto this promise.
    ///
    /// The continuation runs as a fresh unit of work that awaits this
    /// promise, applies `on_success` to a successful value, and
    /// normalizes the callback's [`Step`]. Failures propagate unchanged.
    pub fn then<U, F>(self, on_success: F) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Step<U> + Send + 'static,
    {
        Promise::spawn(async move {
            match self.wait().await {
                Ok(value) => on_success(value).resolve().await,
                Err(reason) => Err(reason),
            }
        })
    }

    /// Like [`Promise::then`], with a failure callback whose normalized
    /// result replaces the failure.
    pub fn then_or_else<U, F, G>(self, on_success: F, on_failure: G) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Step<U> + Send + 'static,
        G: FnOnce(FetchError) -> Step<U> + Send + 'static,
    {
        Promise::spawn(async move {
            match self.wait().await {
                Ok(value) => on_success(value).resolve().await,
                Err(reason) => on_failure(reason).resolve().await,
            }
        })
    }
}

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::errors::AuthError;
use crate::session::SessionData;

/// A value the resolver can hand back as the authenticated user.
///
/// A resolved value that is not truthy is treated the same as no user.
pub trait Identity: Clone + Send + Sync + 'static {
    fn is_truthy(&self) -> bool {
        true
    }
}

impl Identity for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Identity for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Identity for &'static str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! zero_is_falsy {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Identity for $ty {
                fn is_truthy(&self) -> bool {
                    *self != $zero
                }
            }
        )*
    };
}

zero_is_falsy!(
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, i128 => 0, isize => 0,
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, u128 => 0, usize => 0,
    f32 => 0.0, f64 => 0.0,
);

impl<T> Identity for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Identity for HashMap<K, V, S>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Identity for BTreeMap<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Identity for serde_json::Value {
    fn is_truthy(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}

type ResolveFuture<U> = BoxFuture<'static, Result<Option<U>, AuthError>>;
type ResolveFn<U> = dyn Fn(SessionData) -> ResolveFuture<U> + Send + Sync;

/// Application supplied mapping from session data to a user.
///
/// Both plain and async functions are accepted; they are normalized into a
/// single awaitable form so callers never care which kind was given.
pub struct RetrieveUserHandler<U> {
    inner: Arc<ResolveFn<U>>,
}

impl<U> Clone for RetrieveUserHandler<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U> std::fmt::Debug for RetrieveUserHandler<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieveUserHandler").finish_non_exhaustive()
    }
}

impl<U: Identity> RetrieveUserHandler<U> {
    /// Wrap a synchronous resolver
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(SessionData) -> Option<U> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |data: SessionData| -> ResolveFuture<U> {
                let user = f(data);
                async move { Ok(user) }.boxed()
            }),
        }
    }

    /// Wrap an async resolver
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(SessionData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<U>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |data: SessionData| -> ResolveFuture<U> {
                f(data).map(Ok).boxed()
            }),
        }
    }

    /// Wrap a fallible async resolver. Its errors surface as internal
    /// errors, not as authentication rejections.
    pub fn try_from_async<F, Fut, E>(f: F) -> Self
    where
        F: Fn(SessionData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<U>, E>> + Send + 'static,
        E: Display,
    {
        Self {
            inner: Arc::new(move |data: SessionData| -> ResolveFuture<U> {
                f(data)
                    .map(|result| result.map_err(|e| AuthError::Internal(e.to_string())))
                    .boxed()
            }),
        }
    }

    pub async fn retrieve(&self, data: SessionData) -> Result<Option<U>, AuthError> {
        (self.inner)(data).await
    }
}

//! Failure-as-value result model.
//!
//! [`Outcome`] is the tagged union returned by every fallible boundary in
//! this crate. [`run_fallible`] and [`run_fallible_async`] convert both error
//! returns and panics into a [`FailureRecord`], so a wrapped operation yields
//! exactly one `Outcome` and never unwinds past the capture boundary.
//!
//! This module performs no retries and no logging; it only creates records.

use std::any::type_name;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, Location};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;

use crate::util::clock::now_ms;

/// Structured diagnostic payload attached to a failure record.
pub type FailureContext = HashMap<String, serde_json::Value>;

/// Category assigned to panics and other unidentifiable failure payloads.
pub const UNKNOWN_ERROR: &str = "UnknownError";

/// Structured failure payload: classification, message, best-effort origin,
/// creation timestamp, optional diagnostic context, and optional cause chain.
///
/// Records are immutable once handed to a caller. The
/// [`FailurePool`](crate::core::FailurePool) recycles their storage, but only
/// after the caller has moved the record back via `release` — ownership makes
/// use-after-release unrepresentable.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    category: String,
    message: String,
    origin_site: String,
    created_at_ms: u64,
    context: Option<FailureContext>,
    #[serde(skip)]
    cause: Option<Arc<dyn Error + Send + Sync>>,
    #[serde(skip)]
    pool_id: Option<u64>,
}

impl FailureRecord {
    /// Create a record with the given classification tag and message.
    ///
    /// The origin site is captured from the caller's location.
    #[track_caller]
    #[must_use]
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(Location::caller(), category.into(), message.into())
    }

    pub(crate) fn at(site: &Location<'_>, category: String, message: String) -> Self {
        Self {
            category,
            message,
            origin_site: format!("{}:{}", site.file(), site.line()),
            created_at_ms: now_ms(),
            context: None,
            cause: None,
            pool_id: None,
        }
    }

    /// Reuse this record's storage for a fresh failure. Pool-internal.
    pub(crate) fn reset_for_reuse(&mut self, site: &Location<'_>, category: &str, message: &str) {
        use fmt::Write as _;
        self.category.clear();
        self.category.push_str(category);
        self.message.clear();
        self.message.push_str(message);
        self.origin_site.clear();
        let _ = write!(self.origin_site, "{}:{}", site.file(), site.line());
        self.created_at_ms = now_ms();
        self.context = None;
        self.cause = None;
    }

    pub(crate) fn mark_pooled(mut self, pool_id: u64) -> Self {
        self.pool_id = Some(pool_id);
        self
    }

    pub(crate) const fn pool_id(&self) -> Option<u64> {
        self.pool_id
    }

    /// Attach (or merge into) the structured diagnostic context.
    #[must_use]
    pub fn with_context(mut self, context: FailureContext) -> Self {
        self.context
            .get_or_insert_with(FailureContext::new)
            .extend(context);
        self
    }

    /// Attach the triggering error, enabling cause chains.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Convert an arbitrary error into a failure record.
    ///
    /// A `FailureRecord` passed in is returned unchanged apart from merging
    /// the extra `context`, preserving its original origin and timestamp.
    /// Any other error gets a category derived from its type name and is
    /// kept as the record's cause.
    #[track_caller]
    pub fn from_error<E>(err: E, context: Option<FailureContext>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::from_error_at(Location::caller(), err, context)
    }

    pub(crate) fn from_error_at<E>(
        site: &Location<'_>,
        err: E,
        context: Option<FailureContext>,
    ) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let category = short_type_name::<E>();
        let boxed: Box<dyn Error + Send + Sync> = Box::new(err);
        match boxed.downcast::<Self>() {
            Ok(record) => {
                let record = *record;
                match context {
                    Some(extra) => record.with_context(extra),
                    None => record,
                }
            }
            Err(other) => {
                let mut record = Self::at(site, category, other.to_string());
                record.cause = Some(Arc::from(other));
                record.context = context;
                record
            }
        }
    }

    /// Convert a panic payload into a failure record.
    ///
    /// Panic payloads carry no runtime type name, so the category is
    /// [`UNKNOWN_ERROR`]; string payloads become the message.
    pub(crate) fn from_panic_at(
        site: &Location<'_>,
        payload: Box<dyn std::any::Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "operation panicked with a non-string payload".to_string()
        };
        let mut record = Self::at(site, UNKNOWN_ERROR.to_string(), message.clone());
        record.cause = Some(Arc::new(PanicCause(message)));
        record
    }

    /// Classification tag, e.g. `"ValidationError"` or `"NetworkError"`.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Best-effort identifier of the call site that produced the record
    /// (`file:line`), or `"unknown"` when not capturable.
    #[must_use]
    pub fn origin_site(&self) -> &str {
        &self.origin_site
    }

    /// Creation timestamp in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Caller-supplied structured diagnostic payload, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&FailureContext> {
        self.context.as_ref()
    }

    /// The triggering error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync)> {
        self.cause.as_deref()
    }

    /// Whether this record's storage came from a [`FailurePool`].
    ///
    /// Internal bookkeeping only; never semantically significant to callers.
    ///
    /// [`FailurePool`]: crate::core::FailurePool
    #[must_use]
    pub const fn is_pooled(&self) -> bool {
        self.pool_id.is_some()
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl Error for FailureRecord {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Cause wrapper for panic payloads, so panics participate in cause chains.
#[derive(Debug)]
struct PanicCause(String);

impl fmt::Display for PanicCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.0)
    }
}

impl Error for PanicCause {}

/// Tagged union of a successful value or a structured failure.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed; the record describes how.
    Failure(FailureRecord),
}

impl<T> Outcome<T> {
    /// True if this outcome holds a value.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// True if this outcome holds a failure record.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The value, discarding any failure.
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The failure record, discarding any value.
    #[must_use]
    pub fn failure(self) -> Option<FailureRecord> {
        match self {
            Self::Success(_) => None,
            Self::Failure(record) => Some(record),
        }
    }

    /// Borrow the failure record, if this is a failure.
    #[must_use]
    pub const fn failure_ref(&self) -> Option<&FailureRecord> {
        match self {
            Self::Success(_) => None,
            Self::Failure(record) => Some(record),
        }
    }

    /// Convert into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure record if this outcome is a failure.
    pub fn into_result(self) -> Result<T, FailureRecord> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(record) => Err(record),
        }
    }
}

impl<T> From<Result<T, FailureRecord>> for Outcome<T> {
    fn from(result: Result<T, FailureRecord>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(record) => Self::Failure(record),
        }
    }
}

/// Run a synchronous fallible operation, converting both error returns and
/// panics into a [`FailureRecord`].
///
/// Returns exactly one `Outcome` and never unwinds.
#[track_caller]
pub fn run_fallible<T, E, F>(f: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Error + Send + Sync + 'static,
{
    let site = Location::caller();
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Outcome::Success(value),
        Ok(Err(err)) => Outcome::Failure(FailureRecord::from_error_at(site, err, None)),
        Err(payload) => Outcome::Failure(FailureRecord::from_panic_at(site, payload)),
    }
}

/// Run an asynchronous fallible operation, converting both error returns and
/// panics into a [`FailureRecord`].
///
/// Returns exactly one `Outcome` and never unwinds.
#[track_caller]
pub fn run_fallible_async<T, E, F, Fut>(f: F) -> impl Future<Output = Outcome<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + Send + Sync + 'static,
{
    run_fallible_async_at(Location::caller(), f)
}

pub(crate) fn run_fallible_async_at<T, E, F, Fut>(
    site: &'static Location<'static>,
    f: F,
) -> impl Future<Output = Outcome<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + Send + Sync + 'static,
{
    async move {
        // The closure itself may panic before returning a future, so it is
        // invoked inside the guarded async block.
        match AssertUnwindSafe(async move { f().await }).catch_unwind().await {
            Ok(Ok(value)) => Outcome::Success(value),
            Ok(Err(err)) => Outcome::Failure(FailureRecord::from_error_at(site, err, None)),
            Err(payload) => Outcome::Failure(FailureRecord::from_panic_at(site, payload)),
        }
    }
}

fn short_type_name<E>() -> String {
    let full = type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

use std::time::Duration;

use serde::Serialize;

use crate::{ParamValue, Params, PollError};

/// Built-in delay before a failed attempt is retried.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5_000);

/// HTTP method used for an attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    /// `GET`, the default.
    #[default]
    Get,
    /// `PUT` with a JSON body.
    Put,
    /// `POST` with a JSON body.
    Post,
    /// `DELETE`.
    Delete,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Put => reqwest::Method::PUT,
            Self::Post => reqwest::Method::POST,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Delay policy applied after a failed attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retry {
    /// Retry after [`DEFAULT_RETRY_DELAY`].
    #[default]
    Default,
    /// Retry after the given delay. A zero delay disables retry.
    After(Duration),
    /// Give up after the first failure.
    Never,
}

impl Retry {
    /// Resolves the policy to a concrete delay, `None` when retry is off.
    pub fn delay(self) -> Option<Duration> {
        match self {
            Self::Default => Some(DEFAULT_RETRY_DELAY),
            Self::After(delay) if delay.is_zero() => None,
            Self::After(delay) => Some(delay),
            Self::Never => None,
        }
    }
}

/// Immutable description of one HTTP exchange: target URL, query
/// parameters, headers, method, optional JSON body and retry policy.
///
/// A descriptor is built once and handed to a [`Poller`](crate::Poller),
/// which sends it unchanged on every attempt, or passed to
/// [`JsonClient::send`](crate::JsonClient::send) for a single exchange.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) path: String,
    pub(crate) method: Method,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) params: Params,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) retry: Retry,
}

impl Request {
    /// Creates a descriptor for `path` with the given method.
    ///
    /// `path` must be an absolute URL; it may already carry a query string,
    /// which [`param`](Self::param) values override key by key.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: Vec::new(),
            params: Params::new(),
            body: None,
            retry: Retry::Default,
        }
    }

    /// `GET` descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `PUT` descriptor.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `POST` descriptor.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `DELETE` descriptor.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Adds a request header, sent verbatim on every attempt.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter, overriding one already present in the path.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params = self.params.set(key, value);
        self
    }

    /// Replaces the whole parameter set.
    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    /// Sets the JSON request body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, PollError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Retries a failed attempt after `delay` instead of the default.
    ///
    /// A zero delay disables retry, same as [`no_retry`](Self::no_retry).
    pub fn retry_after(mut self, delay: Duration) -> Self {
        self.retry = Retry::After(delay);
        self
    }

    /// Disables retry: the first failed attempt ends the poll.
    pub fn no_retry(mut self) -> Self {
        self.retry = Retry::Never;
        self
    }

    /// Target URL as given, before query parameters are merged in.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Retry policy.
    pub fn retry(&self) -> Retry {
        self.retry
    }
}

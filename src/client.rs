use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{params, Params, PollError, Request, Result};

/// HTTP client for JSON endpoints.
///
/// Wraps a shared [`reqwest::Client`] plus a set of default headers and
/// query parameters that are attached to every request. Defaults override
/// per-call parameters under the same key, so a client pinned to
/// `?tenant=a` always queries tenant `a`.
///
/// Cloning is cheap and all clones share the same connection pool.
#[derive(Clone)]
pub struct JsonClient {
    http: reqwest::Client,
    headers: Vec<(String, String)>,
    params: Params,
}

impl fmt::Debug for JsonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values routinely carry credentials; print names only.
        let header_names: Vec<&str> = self
            .headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        f.debug_struct("JsonClient")
            .field("headers", &header_names)
            .field("params", &self.params)
            .finish()
    }
}

impl Default for JsonClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonClient {
    /// Creates a client with no default headers or parameters.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            headers: Vec::new(),
            params: Params::new(),
        }
    }

    /// Adds headers sent with every request issued through this client.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use micropoll::JsonClient;
    ///
    /// let client = JsonClient::new().with_headers([("x-api-key", "secret")]);
    /// ```
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Adds query parameters sent with every request issued through this
    /// client. They override per-call parameters under the same key.
    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    /// Sends `GET` and decodes the JSON response body into `T`.
    pub async fn get<T, P>(&self, path: &str, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Into<Params>,
    {
        self.send(&Request::get(path).params(params)).await
    }

    /// Sends `POST` with a JSON body and decodes the response into `T`.
    pub async fn post<T, B, P>(&self, path: &str, body: &B, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
        P: Into<Params>,
    {
        self.send(&Request::post(path).params(params).json(body)?).await
    }

    /// Sends `PUT` with a JSON body and decodes the response into `T`.
    pub async fn put<T, B, P>(&self, path: &str, body: &B, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
        P: Into<Params>,
    {
        self.send(&Request::put(path).params(params).json(body)?).await
    }

    /// Sends `DELETE`, ignoring any response body.
    pub async fn delete<P: Into<Params>>(&self, path: &str, params: P) -> Result<()> {
        let request = Request::delete(path).params(params);
        self.send_raw(&request, &CancellationToken::new()).await?;
        Ok(())
    }

    /// Sends one request described by `request` and decodes the JSON
    /// response body into `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        self.send_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Sends one request, aborting with [`PollError::Cancelled`] as soon as
    /// `cancel` trips, whether the exchange is connecting, waiting on the
    /// server or streaming the body.
    pub(crate) async fn send_cancellable<T: DeserializeOwned>(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let body = self.send_raw(request, cancel).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_raw(&self, request: &Request, cancel: &CancellationToken) -> Result<String> {
        // Per-call parameters first, client defaults after, so the defaults
        // win when both set the same key.
        let mut merged: Vec<_> = request.params.pairs().to_vec();
        merged.extend(self.params.pairs().iter().cloned());
        let url = params::build_url(&request.path, &merged)?;

        let mut builder = self.http.request(request.method.as_reqwest(), url);
        for (name, value) in self.headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            outcome = builder.send() => outcome?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Http {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_owned(),
            });
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            outcome = response.text() => outcome?,
        };
        Ok(body)
    }
}

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::Session;
use crate::{JsonClient, PollError, Request};

type CallbackFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Callback<A> = Arc<dyn Fn(A) -> CallbackFuture + Send + Sync>;

struct Inner<T> {
    client: JsonClient,
    request: Request,
    on_success: Option<Callback<T>>,
    on_error: Option<Callback<PollError>>,
    session: Mutex<Session>,
}

impl<T> Inner<T> {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Wakes a parked driver task so it notices the poller is gone.
        self.session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .supersede(None);
    }
}

/// Handle to a scheduled poll of one HTTP endpoint.
///
/// Created through [`Poller::builder`]. A poller repeatedly sends its
/// [`Request`] and feeds each decoded response to the success callback:
///
/// - [`start`](Self::start) begins a session (or a single shot) and
///   resolves once the first attempt settles,
/// - [`refresh`](Self::refresh) forces an immediate out-of-cycle attempt,
/// - [`stop`](Self::stop) cancels the in-flight request and pending timer.
///
/// Handles are cheap to clone and all clones drive the same session. When
/// the last handle is dropped the session is cancelled as if by `stop()`;
/// an attempt that is already settling may still finish its callback.
pub struct Poller<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Poller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("request", &self.inner.request)
            .finish_non_exhaustive()
    }
}

impl<T> Poller<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    /// Starts configuring a poller for `request`.
    pub fn builder(request: Request) -> PollerBuilder<T> {
        PollerBuilder {
            request,
            client: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Begins polling, replacing any session already running.
    ///
    /// The first attempt is sent immediately; the live request and pending
    /// timer of a previous session are cancelled without settling. With an
    /// interval the session repeats `every` after each success, without one
    /// it runs a single shot (failures still follow the request's retry
    /// policy either way).
    ///
    /// Resolves once the first attempt settles: the decoded response on
    /// success, `None` on failure or when the attempt was cancelled or
    /// superseded before settling. Later attempts report only through the
    /// callbacks.
    pub async fn start(&self, every: impl Into<Option<Duration>>) -> Option<T> {
        let every = every.into();
        let epoch = self.inner.session().supersede(every);
        debug!(
            path = self.inner.request.path(),
            every_ms = every.map(|interval| interval.as_millis() as u64),
            "poll session started"
        );
        let (notify, first) = oneshot::channel();
        tokio::spawn(drive(Arc::downgrade(&self.inner), epoch, notify));
        first.await.ok().flatten()
    }

    /// Forces an immediate attempt, keeping the recorded interval.
    ///
    /// Equivalent to calling [`start`](Self::start) with the interval of
    /// the current session; without one it runs a single shot. Resolves
    /// like `start` does.
    pub async fn refresh(&self) -> Option<T> {
        let every = self.inner.session().refresh_interval();
        self.start(every).await
    }

    /// Ends the session: cancels the in-flight request, disarms the pending
    /// timer and clears the recorded interval.
    ///
    /// A cancelled attempt settles silently, with neither callback invoked.
    /// Stopping an idle poller does nothing; repeated calls are harmless.
    pub fn stop(&self) {
        self.inner.session().supersede(None);
        debug!(path = self.inner.request.path(), "poll session stopped");
    }
}

/// Configures a [`Poller`]: callbacks and the client to send through.
pub struct PollerBuilder<T> {
    request: Request,
    client: Option<JsonClient>,
    on_success: Option<Callback<T>>,
    on_error: Option<Callback<PollError>>,
}

impl<T> PollerBuilder<T>
where
    T: Send + 'static,
{
    /// Runs `callback` with each decoded response.
    ///
    /// The callback runs on its own task; a panic inside it is logged and
    /// does not end the session.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(move |data: T| -> CallbackFuture {
            callback(data);
            Box::pin(std::future::ready(()))
        }));
        self
    }

    /// Async flavor of [`on_success`](Self::on_success): the returned
    /// future is awaited before the next attempt is scheduled.
    pub fn on_success_future<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_success = Some(Arc::new(move |data: T| -> CallbackFuture {
            Box::pin(callback(data))
        }));
        self
    }

    /// Runs `callback` with each failed attempt's error. Cancellation is
    /// not failure: a stopped or superseded attempt never reports here.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(PollError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(move |error: PollError| -> CallbackFuture {
            callback(error);
            Box::pin(std::future::ready(()))
        }));
        self
    }

    /// Async flavor of [`on_error`](Self::on_error).
    pub fn on_error_future<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(PollError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error: PollError| -> CallbackFuture {
            Box::pin(callback(error))
        }));
        self
    }

    /// Sends attempts through `client` instead of a fresh default client.
    pub fn client(mut self, client: JsonClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the poller. Nothing is sent until [`Poller::start`].
    pub fn build(self) -> Poller<T> {
        Poller {
            inner: Arc::new(Inner {
                client: self.client.unwrap_or_default(),
                request: self.request,
                on_success: self.on_success,
                on_error: self.on_error,
                session: Mutex::new(Session::new()),
            }),
        }
    }
}

/// Drives one session generation: attempt, wait, attempt, until the
/// generation is superseded, the schedule runs out or the poller is
/// dropped. Holds only a weak handle while parked so dropping the last
/// [`Poller`] clone tears the session down.
async fn drive<T>(inner: Weak<Inner<T>>, epoch: u64, notify: oneshot::Sender<Option<T>>)
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let mut notify = Some(notify);
    loop {
        let Some(inner) = inner.upgrade() else { return };

        let (value, next_delay) = run_attempt(&inner, epoch, notify.is_some()).await;
        if let Some(notify) = notify.take() {
            let _ = notify.send(value);
        }
        let Some(delay) = next_delay else { return };

        let timer = CancellationToken::new();
        if !inner.session().arm(epoch, timer.clone()) {
            return;
        }
        drop(inner);

        tokio::select! {
            _ = timer.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Runs a single attempt under `epoch` and settles it: dispatches the
/// callback for the outcome and picks the delay before the next attempt
/// (`None` ends the session). `want_value` asks for the decoded response
/// to hand back to the `start()` caller.
async fn run_attempt<T>(
    inner: &Arc<Inner<T>>,
    epoch: u64,
    want_value: bool,
) -> (Option<T>, Option<Duration>)
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let cancel = CancellationToken::new();
    if !inner.session().begin_attempt(epoch, cancel.clone()) {
        return (None, None);
    }

    debug!(path = inner.request.path(), "poll attempt");
    match inner
        .client
        .send_cancellable::<T>(&inner.request, &cancel)
        .await
    {
        Ok(data) => {
            if !inner.session().settle(epoch) {
                return (None, None);
            }
            let value = match &inner.on_success {
                Some(callback) => {
                    let value = want_value.then(|| data.clone());
                    run_callback(Arc::clone(callback), data, "success").await;
                    value
                }
                None => want_value.then_some(data),
            };
            // Repeat only for a session that has both an interval and a
            // consumer for the responses.
            let next = if inner.on_success.is_some() {
                inner.session().refresh_interval()
            } else {
                None
            };
            (value, next)
        }
        Err(PollError::Cancelled) => (None, None),
        Err(PollError::Json(error)) => {
            if !inner.session().settle(epoch) {
                return (None, None);
            }
            warn!(
                path = inner.request.path(),
                error = %error,
                "response body did not decode, keeping the schedule"
            );
            let next = if inner.on_success.is_some() {
                inner.session().refresh_interval()
            } else {
                None
            };
            (None, next)
        }
        Err(error) => {
            if !inner.session().settle(epoch) {
                return (None, None);
            }
            debug!(path = inner.request.path(), error = %error, "poll attempt failed");
            if let Some(callback) = &inner.on_error {
                run_callback(Arc::clone(callback), error, "error").await;
            }
            (None, inner.request.retry().delay())
        }
    }
}

/// Invokes a callback on its own task so a panic inside it is contained.
async fn run_callback<A: Send + 'static>(
    callback: Callback<A>,
    argument: A,
    kind: &'static str,
) {
    let task = tokio::spawn(async move { callback(argument).await });
    if task.await.is_err() {
        warn!(callback = kind, "poll callback panicked");
    }
}

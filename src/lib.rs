//! `micropoll` is a small async client for scheduled HTTP polling.
//!
//! Describe an exchange once with a [`Request`], attach callbacks, and the
//! [`Poller`] keeps the endpoint polled:
//! - [`Poller::start`] begins a session (or a single shot) and awaits the
//!   first response
//! - [`Poller::refresh`] forces an immediate out-of-cycle attempt
//! - [`Poller::stop`] cancels the in-flight request and the pending timer
//!
//! One-off exchanges go through [`JsonClient`] directly.

mod client;
mod error;
mod params;
mod poller;
mod request;
mod session;

pub use client::JsonClient;
pub use error::PollError;
pub use params::{ParamValue, Params};
pub use poller::{Poller, PollerBuilder};
pub use request::{Method, Request, Retry, DEFAULT_RETRY_DELAY};

pub type Result<T> = std::result::Result<T, PollError>;

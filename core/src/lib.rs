//! Resilient HTTP client layer shared by devflow's service integrations.
//!
//! # Overview
//! The ticket system, issue tracker and AI generation adapters all issue
//! their calls through this crate. It owns request issuance, JSON transport,
//! the error taxonomy and backoff-retry orchestration, and nothing else.
//!
//! # Design
//! - `HttpClient::send` is the transport: one request, raw response.
//! - `HttpClient::send_json` is the JSON envelope: encode, send, classify
//!   any status >= 400 as `Error::Http`, decode.
//! - `RetryPolicy::run` (and `HttpClient::with_retry`) repeats an operation
//!   on transient failure with capped exponential backoff.
//! - Every call takes a `Context` for cooperative cancellation and deadlines.
//! - `ClientConfig` is fixed at construction and shared read-only, so one
//!   client can serve concurrent calls.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod retry;
pub mod trace;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use context::{Context, ContextError};
pub use error::{extract_http_error, is_http_error, Error, HttpError, Result};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use retry::RetryPolicy;

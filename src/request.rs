use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, fmt::Debug};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{Settings, Verbosity};
use crate::worker_pool::Executable;

/// One GET to perform. Every descriptor of a run points at the same url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: Arc<str>,
}

impl RequestDescriptor {
    pub fn new(url: &str) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub elapsed: Duration,
    pub status: u16,
    /// Reported length, or the number of bytes read when the server sent none
    pub content_length: u64,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub elapsed: Duration,
    pub error: RequestError,
}

/// What came back from a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Response(ResponseRecord),
    Failure(FailureRecord),
}

impl FetchOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            FetchOutcome::Response(response) => response.elapsed,
            FetchOutcome::Failure(failure) => failure.elapsed,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, FetchOutcome::Response(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Send,
    Body,
}

/// A failed fetch, with the transport traits captured when it happened so it
/// can be classified later without holding on to the transport error itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub msg: String,
    pub stage: FetchStage,
    /// raised by the network layer, as opposed to request construction or decoding
    pub network: bool,
    pub timeout: bool,
    pub temporary: bool,
}

impl RequestError {
    pub(crate) fn from_reqwest(stage: FetchStage, value: reqwest::Error) -> Self {
        let io_kind = io_error_kind(&value);
        let timeout = value.is_timeout() || io_kind == Some(io::ErrorKind::TimedOut);
        let temporary = value.is_connect() || io_kind.map(is_temporary_kind).unwrap_or(false);
        let network = timeout
            || temporary
            || io_kind.is_some()
            || value.is_request()
            || value.is_body();
        RequestError {
            msg: value.to_string(),
            stage,
            network,
            timeout,
            temporary,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stage {
            FetchStage::Send => write!(f, "RequestError ({})", self.msg),
            FetchStage::Body => write!(f, "RequestError (reading body: {})", self.msg),
        }
    }
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = inner.source();
    }
    None
}

fn is_temporary_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

#[derive(Debug, Clone)]
pub struct FetcherOptions {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub keep_body: bool,
}

impl FetcherOptions {
    pub fn from_settings(settings: &Settings, verbosity: Verbosity) -> Self {
        Self {
            request_timeout: settings.request_timeout(),
            connect_timeout: settings.connect_timeout(),
            user_agent: settings.user_agent(),
            keep_body: verbosity == Verbosity::PerCall,
        }
    }
}

/// Performs GETs through a reqwest client. Cloning a fetcher shares its
/// connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    keep_body: bool,
}

impl Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("keep_body", &self.keep_body)
            .finish()
    }
}

impl Fetcher {
    pub fn new(options: &FetcherOptions) -> Result<Self, reqwest::Error> {
        // load targets are test and staging hosts, often with self-signed certificates
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            keep_body: options.keep_body,
        })
    }

    /// One fetcher per worker: clones of a single client when `reuse` is set,
    /// independent clients otherwise.
    pub fn for_workers(
        options: &FetcherOptions,
        workers: usize,
        reuse: bool,
    ) -> Result<Vec<Self>, reqwest::Error> {
        if reuse {
            let shared = Self::new(options)?;
            return Ok(vec![shared; workers]);
        }
        (0..workers).map(|_| Self::new(options)).collect()
    }
}

#[async_trait]
impl Executable for Fetcher {
    #[tracing::instrument(level = "debug", skip(self, request), fields(url = %request.url))]
    async fn execute(&self, request: &RequestDescriptor) -> FetchOutcome {
        let start = Instant::now();
        let response = match self.client.get(request.url.as_ref()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "request failed");
                return FetchOutcome::Failure(FailureRecord {
                    elapsed: start.elapsed(),
                    error: RequestError::from_reqwest(FetchStage::Send, e),
                });
            }
        };
        let status = response.status().as_u16();
        let reported_length = response.content_length();
        let body = response.bytes().await;
        let elapsed = start.elapsed();
        match body {
            Ok(body) => {
                debug!(status, elapsed_ms = elapsed.as_millis() as u64, "response received");
                FetchOutcome::Response(ResponseRecord {
                    elapsed,
                    status,
                    content_length: reported_length.unwrap_or(body.len() as u64),
                    body: self
                        .keep_body
                        .then(|| String::from_utf8_lossy(&body).into_owned()),
                })
            }
            Err(e) => {
                debug!(status, error = %e, "body read failed");
                FetchOutcome::Failure(FailureRecord {
                    elapsed,
                    error: RequestError::from_reqwest(FetchStage::Body, e),
                })
            }
        }
    }
}

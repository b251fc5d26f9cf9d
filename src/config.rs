use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use confique::Config;
use reqwest::Url;

/// Transport tuning, read from an optional settings file and the environment.
#[derive(Debug, Config)]
pub struct Settings {
    /// Overall deadline for a single request, body included
    #[config(env = "WBENCH_TIMEOUT_MS", default = 30000)]
    pub request_timeout_ms: u64,
    #[config(env = "WBENCH_CONNECT_TIMEOUT_MS", default = 10000)]
    pub connect_timeout_ms: u64,
    #[config(env = "WBENCH_USER_AGENT")]
    pub user_agent: Option<String>,
    /// Successful calls between two snapshots when running with `-v 1`
    #[config(default = 100)]
    pub snapshot_interval: usize,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, confique::Error> {
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        builder.load()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!("{}_v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    /// a snapshot every `snapshot_interval` successful calls
    Periodic,
    PerCall,
}

impl TryFrom<u8> for Verbosity {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Verbosity::Silent),
            1 => Ok(Verbosity::Periodic),
            2 => Ok(Verbosity::PerCall),
            other => bail!("unknown verbosity level {other}, expected 0, 1 or 2"),
        }
    }
}

/// Everything a run needs, fixed before the first request goes out.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub url: String,
    pub concurrency: usize,
    pub requests: usize,
    pub verbosity: Verbosity,
    pub reuse_client: bool,
    pub snapshot_interval: usize,
}

impl RunConfiguration {
    pub fn new(
        url: String,
        concurrency: usize,
        requests: usize,
        verbosity: Verbosity,
        reuse_client: bool,
    ) -> anyhow::Result<Self> {
        Url::parse(&url).with_context(|| format!("invalid target url {url:?}"))?;
        ensure!(concurrency >= 1, "concurrency must be at least 1");
        ensure!(requests >= 1, "number of requests must be at least 1");
        Ok(Self {
            url,
            concurrency,
            requests,
            verbosity,
            reuse_client,
            snapshot_interval: 100,
        })
    }

    pub fn with_snapshot_interval(mut self, snapshot_interval: usize) -> Self {
        self.snapshot_interval = snapshot_interval;
        self
    }
}

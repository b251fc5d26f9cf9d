use std::collections::HashMap;
use std::time::Duration;

use crate::request::{FetchOutcome, RequestError};

use super::classify::classify;
use super::report::{ClassifiedError, FinalReport, LatencySummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min: Duration,
    pub max: Duration,
}

/// Running aggregates over the outcomes of a run. Owned by a single collector.
#[derive(Debug, Default)]
pub struct Statistics {
    calls: usize,
    range: Option<LatencyRange>,
    total: Duration,
    status_codes: HashMap<u16, usize>,
    errors: Vec<RequestError>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, outcome: &FetchOutcome) {
        let response = match outcome {
            FetchOutcome::Failure(failure) => {
                self.errors.push(failure.error.clone());
                return;
            }
            FetchOutcome::Response(response) => response,
        };

        let elapsed = response.elapsed;
        self.calls += 1;
        self.total += elapsed;
        *self.status_codes.entry(response.status).or_insert(0) += 1;

        // equal latencies leave both bounds untouched
        self.range = Some(match self.range {
            None => LatencyRange {
                min: elapsed,
                max: elapsed,
            },
            Some(range) if elapsed < range.min => LatencyRange {
                min: elapsed,
                ..range
            },
            Some(range) if elapsed > range.max => LatencyRange {
                max: elapsed,
                ..range
            },
            Some(range) => range,
        });
    }

    /// Successful calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// `None` until a call succeeded.
    pub fn average(&self) -> Option<Duration> {
        if self.calls == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / self.calls as u128;
        Some(Duration::from_nanos(nanos as u64))
    }

    pub fn observed(&self) -> usize {
        self.calls + self.errors.len()
    }

    pub fn latency(&self) -> Option<LatencySummary> {
        let range = self.range?;
        let avg = self.average()?;
        Some(LatencySummary {
            min: range.min,
            avg,
            max: range.max,
        })
    }

    /// Snapshot line: call count plus running min/avg/max in whole milliseconds.
    pub fn snapshot(&self) -> String {
        match self.latency() {
            Some(latency) => format!(
                "Calls: {:6}\tMin: {:6}ms\tAvg: {:6}ms\tMax: {:6}ms",
                self.calls,
                latency.min.as_millis(),
                latency.avg.as_millis(),
                latency.max.as_millis()
            ),
            None => format!("Calls: {:6}\tno successful calls", self.calls),
        }
    }

    pub fn final_report(self, url: &str, attempted: usize) -> FinalReport {
        let latency = self.latency();
        let errors = self
            .errors
            .into_iter()
            .enumerate()
            .map(|(index, error)| ClassifiedError {
                index,
                class: classify(&error),
                error,
            })
            .collect();
        FinalReport {
            url: url.to_owned(),
            attempted,
            successful: self.calls,
            latency,
            status_codes: self.status_codes.into_iter().collect(),
            errors,
        }
    }
}

use std::io::{self, Write};

use crate::config::Verbosity;
use crate::request::FetchOutcome;

use super::statistics::Statistics;

/// Feeds outcomes into [`Statistics`] one at a time and writes progress lines
/// according to the verbosity of the run.
pub struct Collector<W> {
    stats: Statistics,
    verbosity: Verbosity,
    snapshot_interval: usize,
    out: W,
}

impl<W: Write> Collector<W> {
    pub fn new(verbosity: Verbosity, snapshot_interval: usize, out: W) -> Self {
        Self {
            stats: Statistics::new(),
            verbosity,
            snapshot_interval,
            out,
        }
    }

    /// `index` is the arrival position of the outcome, starting at 0.
    pub fn observe(&mut self, index: usize, outcome: &FetchOutcome) -> io::Result<()> {
        self.stats.observe(outcome);
        match self.verbosity {
            Verbosity::Silent => Ok(()),
            Verbosity::Periodic => {
                // an interval of 0 disables snapshots
                let due = self.stats.calls().checked_rem(self.snapshot_interval) == Some(0);
                if outcome.is_response() && due {
                    writeln!(self.out, "{}", self.stats.snapshot())?;
                }
                Ok(())
            }
            Verbosity::PerCall => self.per_call_line(index, outcome),
        }
    }

    fn per_call_line(&mut self, index: usize, outcome: &FetchOutcome) -> io::Result<()> {
        let call = outcome.elapsed().as_millis();
        // running columns show `-` until a call succeeded
        let (min, avg, max) = match self.stats.latency() {
            Some(l) => (
                l.min.as_millis().to_string(),
                l.avg.as_millis().to_string(),
                l.max.as_millis().to_string(),
            ),
            None => ("-".to_owned(), "-".to_owned(), "-".to_owned()),
        };
        write!(
            self.out,
            "{:6}: Call: {:6}ms|Min: {:>6}ms|Avg: {:>6}ms|Max: {:>6}ms|",
            index + 1,
            call,
            min,
            avg,
            max
        )?;
        match outcome {
            FetchOutcome::Response(response) => writeln!(
                self.out,
                "Stat:{:3}|Len:{:6}|{}",
                response.status,
                response.content_length,
                response.body.as_deref().unwrap_or_default()
            ),
            FetchOutcome::Failure(failure) => writeln!(self.out, "Failed|{}", failure.error),
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn into_statistics(self) -> Statistics {
        self.stats
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::request::RequestError;

use super::classify::ErrorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    /// position among the captured errors, in arrival order
    pub index: usize,
    pub class: ErrorClass,
    pub error: RequestError,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            ErrorClass::Timeout => write!(f, "Error {} timed out: {}", self.index, self.error),
            ErrorClass::Temporary => {
                write!(f, "Error {} is temporary: {}", self.index, self.error)
            }
            ErrorClass::Other => write!(f, "Error {}: {}", self.index, self.error),
            ErrorClass::Unclassified => {
                write!(f, "Error {} (unclassified): {}", self.index, self.error)
            }
        }
    }
}

/// Outcome of a whole run, printed once at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReport {
    pub url: String,
    pub attempted: usize,
    pub successful: usize,
    /// `None` when no call succeeded
    pub latency: Option<LatencySummary>,
    pub status_codes: BTreeMap<u16, usize>,
    pub errors: Vec<ClassifiedError>,
}

impl FinalReport {
    pub fn count_of(&self, class: ErrorClass) -> usize {
        self.errors.iter().filter(|e| e.class == class).count()
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Result:")?;
        writeln!(f, "URL: {}", self.url)?;
        writeln!(
            f,
            "Requests: {:6}\tFailed: {:6}",
            self.attempted,
            self.errors.len()
        )?;
        match &self.latency {
            Some(latency) => writeln!(
                f,
                "Calls: {:6}\tMin: {:6}ms\tAvg: {:6}ms\tMax: {:6}ms",
                self.successful,
                latency.min.as_millis(),
                latency.avg.as_millis(),
                latency.max.as_millis()
            )?,
            None => writeln!(f, "Calls: {:6}\tno successful calls", self.successful)?,
        }
        for (status, count) in &self.status_codes {
            writeln!(f, "Status {:3}: {} Calls", status, count)?;
        }
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

use crate::request::RequestError;

/// Diagnostic label for a failed call. Never used to drive retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Timeout,
    Temporary,
    Other,
    /// did not come from the network layer at all
    Unclassified,
}

/// A timeout wins over a temporary condition when both are reported.
pub fn classify(error: &RequestError) -> ErrorClass {
    if !error.network {
        ErrorClass::Unclassified
    } else if error.timeout {
        ErrorClass::Timeout
    } else if error.temporary {
        ErrorClass::Temporary
    } else {
        ErrorClass::Other
    }
}

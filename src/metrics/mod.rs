mod classify;
mod collector;
mod report;
mod statistics;

pub(crate) use classify::ErrorClass;
pub(crate) use collector::Collector;
pub(crate) use report::FinalReport;

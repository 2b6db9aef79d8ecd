//! Analysis modules.
//!
//! The processor turns one evaluation config into an experiment result; the
//! aggregator backs its raw-feedback mode.

pub mod aggregator;
pub mod processor;

pub use processor::ConfigProcessor;

//! Data types for the module extraction pipeline.

pub mod attempt;
pub mod config;
pub mod module;
pub mod report;
pub mod request;

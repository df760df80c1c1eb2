pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod pose;
pub mod report;
pub mod score;
pub mod session;
pub mod tracker;

pub mod cache;
pub mod errors;
pub mod executor;
pub mod monitor;
pub mod pipeline;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod errors_test;

pub mod aggregate;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod reports;
pub mod types;
pub mod util;

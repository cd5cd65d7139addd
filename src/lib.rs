pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod sources;
pub mod timestamp;
pub mod types;

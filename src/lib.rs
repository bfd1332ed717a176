pub mod analyzers;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod output;
pub mod predictor;
pub mod store;

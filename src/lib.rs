pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod workers;

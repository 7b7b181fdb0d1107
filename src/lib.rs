pub mod address;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod protocol;
pub mod report;
pub mod rpc;
pub mod tracker;
pub mod types;

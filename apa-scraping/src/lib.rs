pub mod actions;
pub mod aggregator;
pub mod browser;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod data_collector;
pub mod display;
pub mod export;
pub mod pagination;
pub mod parser;
pub mod retry;
pub mod scanner;
pub mod schema;
pub mod session;
pub mod site;

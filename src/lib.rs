pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod facts;
pub mod fetch;
pub mod hours;
pub mod loader;
pub mod output;
pub mod schema;
pub mod station;
pub mod stats;

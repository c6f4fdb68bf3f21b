pub mod aggregator;
pub mod error;
pub mod estimator;
pub mod feed;
pub mod fetch;
pub mod handlers;
pub mod progress;
pub mod stations;
pub mod store;
pub mod writer;

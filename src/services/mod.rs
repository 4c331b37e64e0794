pub mod aggregator;
pub mod catalog;
pub mod fetcher;
pub mod loader;
pub mod pipeline;
pub mod storage;

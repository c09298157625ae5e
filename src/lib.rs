pub mod config;
pub mod crawl;
pub mod enrich;
pub mod fetch;
pub mod listing;
pub mod logging;
pub mod parse;
pub mod pipeline;
pub mod pool;
pub mod product;
pub mod transform;

pub mod core;
pub mod models;
pub mod store;
pub mod daemon;
pub mod sync;
pub mod wal;
pub mod metrics;
pub mod utils;
pub mod handlers;

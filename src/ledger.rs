// Thin re-export module: the pool lives in `ledger/pool.rs`, epoch
// resolution in `ledger/handler.rs`.

pub mod handler;
pub mod pool;

pub use handler::*;
pub use pool::*;

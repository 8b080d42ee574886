//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{is_valid_tx, TxRejection, ValidationPolicy};

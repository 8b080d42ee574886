//! ScroogeCoin - a minimal UTXO ledger core
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger
//! - [`ledger`] - The UTXO pool and epoch resolution (`handle_txs`)
//! - [`transaction`] - Transaction types, signing payloads and validation
//!
//! ## Cryptography
//! - [`crypto`] - Addresses, key pairs and signature verification (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Ledger
// ============================================================================
pub mod ledger;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

//! Shared helpers for the command-line tools: JSON files and a demo batch.

use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::ledger::{OutputRef, UtxoPool};
use crate::transaction::{Transaction, TransactionBuilder, TxHash, TxOutput};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ChainError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ChainError::IoError(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ChainError> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .map_err(|e| ChainError::IoError(format!("{}: {}", path.display(), e)))
}

pub fn load_pool(path: &Path) -> Result<UtxoPool, ChainError> {
    read_json(path)
}

pub fn load_batch(path: &Path) -> Result<Vec<Transaction>, ChainError> {
    read_json(path)
}

/// First 8 bytes in hex followed by an ellipsis.
pub fn short_hex(bytes: &[u8]) -> String {
    if bytes.len() <= 8 {
        hex::encode(bytes)
    } else {
        format!("{}…", hex::encode(&bytes[..8]))
    }
}

/// Hash used as the source of the demo's initial outputs.
pub fn genesis_hash() -> TxHash {
    Sha256::digest(b"ScroogeCoin genesis").into()
}

pub struct DemoParticipants {
    pub scrooge: KeyPair,
    pub alice: KeyPair,
    pub bob: KeyPair,
    pub carol: KeyPair,
    pub mallory: KeyPair,
}

impl DemoParticipants {
    pub fn generate() -> Self {
        DemoParticipants {
            scrooge: KeyPair::generate(),
            alice: KeyPair::generate(),
            bob: KeyPair::generate(),
            carol: KeyPair::generate(),
            mallory: KeyPair::generate(),
        }
    }
}

pub struct DemoFixture {
    pub pool: UtxoPool,
    pub candidates: Vec<Transaction>,
}

/// A genesis pool and a batch exercising the interesting cases.
///
/// Candidates, in order: a spend of a not-yet-created output, the payment
/// creating it, a double spend of the payment's input, a spend leaving an
/// implicit fee, and an overspend. Resolution accepts the payment, the chained
/// spend and the fee spend.
pub fn build_demo(people: &DemoParticipants) -> Result<DemoFixture, ChainError> {
    let genesis = genesis_hash();
    let pool: UtxoPool = [
        (
            OutputRef::new(genesis, 0),
            TxOutput::new(10, people.scrooge.address()),
        ),
        (
            OutputRef::new(genesis, 1),
            TxOutput::new(5, people.scrooge.address()),
        ),
    ]
    .into_iter()
    .collect();

    let pay = TransactionBuilder::new()
        .input(genesis, 0)
        .output(4, people.alice.address())
        .output(6, people.bob.address())
        .sign_all(&people.scrooge)?
        .build();

    let chained = TransactionBuilder::new()
        .input(pay.hash(), 0)
        .output(4, people.carol.address())
        .sign_all(&people.alice)?
        .build();

    let double_spend = TransactionBuilder::new()
        .input(genesis, 0)
        .output(10, people.mallory.address())
        .sign_all(&people.scrooge)?
        .build();

    let with_fee = TransactionBuilder::new()
        .input(genesis, 1)
        .output(3, people.bob.address())
        .sign_all(&people.scrooge)?
        .build();

    let overspend = TransactionBuilder::new()
        .input(pay.hash(), 1)
        .output(7, people.carol.address())
        .sign_all(&people.bob)?
        .build();

    Ok(DemoFixture {
        pool,
        candidates: vec![chained, pay, double_spend, with_fee, overspend],
    })
}

//! Transaction types for ScroogeCoin
use crate::crypto::{Address, KeyPair};
use crate::error::ChainError;
use crate::ledger::OutputRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash of a transaction; the first half of every `OutputRef`.
pub type TxHash = [u8; 32];

/// Monetary value in indivisible minor units.
///
/// Signed so that a negative output can be represented and rejected.
pub type Amount = i64;

/// Maximum encoded transaction size in bytes (100KB) accepted by `from_bytes`
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

const SIGNING_DOMAIN: &[u8] = b"SCROOGE-SIG:";

/// A claim on a previously created output, with the owner's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub outpoint: OutputRef,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// Value locked to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: Amount,
    pub address: Address,
}

impl TxOutput {
    pub fn new(value: Amount, address: Address) -> Self {
        TxOutput { value, address }
    }
}

/// An immutable transaction. The hash is derived from the content on
/// construction and on decode; it is never taken from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTransaction", into = "RawTransaction")]
pub struct Transaction {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    hash: TxHash,
}

#[derive(Serialize, Deserialize)]
struct RawTransaction {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        Transaction::from_parts(raw.inputs, raw.outputs)
    }
}

impl From<Transaction> for RawTransaction {
    fn from(tx: Transaction) -> Self {
        RawTransaction {
            inputs: tx.inputs,
            outputs: tx.outputs,
        }
    }
}

impl Transaction {
    fn from_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let hash = Sha256::digest(raw_bytes(&inputs, &outputs)).into();
        Transaction {
            inputs,
            outputs,
            hash,
        }
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&TxInput> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&TxOutput> {
        self.outputs.get(index)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    /// The key under which this transaction's output `index` lives once applied.
    pub fn output_ref(&self, index: u32) -> OutputRef {
        OutputRef::new(self.hash, index)
    }

    /// Output references claimed by the inputs, in input order.
    pub fn claimed_refs(&self) -> impl Iterator<Item = &OutputRef> + '_ {
        self.inputs.iter().map(|input| &input.outpoint)
    }

    /// The bytes the owner of the output claimed by input `index` must sign.
    ///
    /// Covers that input's outpoint and every output, but no signatures.
    /// `None` when `index` is out of range.
    pub fn signing_payload(&self, index: usize) -> Option<Vec<u8>> {
        signing_payload(&self.inputs, &self.outputs, index)
    }

    /// Bytes hashed to produce the transaction hash (signatures included).
    pub fn raw_bytes(&self) -> Vec<u8> {
        raw_bytes(&self.inputs, &self.outputs)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() > MAX_TRANSACTION_SIZE {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                bytes.len(),
                MAX_TRANSACTION_SIZE
            )));
        }
        Ok(bincode::deserialize(bytes)?)
    }
}

fn signing_payload(inputs: &[TxInput], outputs: &[TxOutput], index: usize) -> Option<Vec<u8>> {
    let input = inputs.get(index)?;
    let mut message = Vec::with_capacity(SIGNING_DOMAIN.len() + 36 + outputs.len() * 41);
    message.extend_from_slice(SIGNING_DOMAIN);
    message.extend_from_slice(&input.outpoint.tx_hash);
    message.extend_from_slice(&input.outpoint.index.to_le_bytes());
    for output in outputs {
        message.extend_from_slice(&output.value.to_le_bytes());
        message.extend_from_slice(output.address.as_bytes());
    }
    Some(message)
}

fn raw_bytes(inputs: &[TxInput], outputs: &[TxOutput]) -> Vec<u8> {
    let mut raw = Vec::new();
    for input in inputs {
        raw.extend_from_slice(&input.outpoint.tx_hash);
        raw.extend_from_slice(&input.outpoint.index.to_le_bytes());
        raw.extend_from_slice(&(input.signature.len() as u64).to_le_bytes());
        raw.extend_from_slice(&input.signature);
    }
    for output in outputs {
        raw.extend_from_slice(&output.value.to_le_bytes());
        raw.extend_from_slice(output.address.as_bytes());
    }
    raw
}

/// Assembles a transaction: add inputs and outputs, sign, then `build`.
///
/// Signatures cover every output, so sign only after the last output is added.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, prev_hash: TxHash, index: u32) -> Self {
        self.inputs.push(TxInput {
            outpoint: OutputRef::new(prev_hash, index),
            signature: Vec::new(),
        });
        self
    }

    pub fn output(mut self, value: Amount, address: Address) -> Self {
        self.outputs.push(TxOutput::new(value, address));
        self
    }

    pub fn signing_payload(&self, index: usize) -> Option<Vec<u8>> {
        signing_payload(&self.inputs, &self.outputs, index)
    }

    /// Attach an externally produced signature to input `index`.
    pub fn signature(mut self, index: usize, signature: Vec<u8>) -> Result<Self, ChainError> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            ChainError::InvalidTransaction(format!("No input at index {}", index))
        })?;
        input.signature = signature;
        Ok(self)
    }

    pub fn sign_input(self, index: usize, keypair: &KeyPair) -> Result<Self, ChainError> {
        let payload = self.signing_payload(index).ok_or_else(|| {
            ChainError::InvalidTransaction(format!("No input at index {}", index))
        })?;
        let signature = keypair.sign(&payload)?;
        self.signature(index, signature.to_vec())
    }

    /// Sign every input with the same key.
    pub fn sign_all(mut self, keypair: &KeyPair) -> Result<Self, ChainError> {
        for index in 0..self.inputs.len() {
            self = self.sign_input(index, keypair)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Transaction {
        Transaction::from_parts(self.inputs, self.outputs)
    }
}

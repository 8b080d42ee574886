//! The UTXO pool: every output created by an accepted transaction and not
//! yet consumed by another one.

use crate::transaction::{Amount, Transaction, TxHash, TxOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reference to output `index` of the transaction with hash `tx_hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    #[serde(with = "hex::serde")]
    pub tx_hash: TxHash,
    pub index: u32,
}

impl OutputRef {
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.tx_hash), self.index)
    }
}

/// One pool entry in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub outpoint: OutputRef,
    pub output: TxOutput,
}

/// Map from `OutputRef` to the unspent output it names.
///
/// `Clone` is a deep copy. Serialized as a list of `{ outpoint, output }`
/// entries sorted by outpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UtxoEntry>", into = "Vec<UtxoEntry>")]
pub struct UtxoPool {
    utxos: HashMap<OutputRef, TxOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, outpoint: &OutputRef) -> Option<&TxOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutputRef) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// Adds or overwrites the mapping, returning the previous output if any.
    pub fn insert(&mut self, outpoint: OutputRef, output: TxOutput) -> Option<TxOutput> {
        self.utxos.insert(outpoint, output)
    }

    pub fn remove(&mut self, outpoint: &OutputRef) -> Option<TxOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputRef, &TxOutput)> + '_ {
        self.utxos.iter()
    }

    /// Snapshot of every entry, ordered by outpoint.
    pub fn all_outputs(&self) -> Vec<(OutputRef, TxOutput)> {
        let mut entries: Vec<_> = self.utxos.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Sum of all output values; `None` on overflow.
    pub fn total_value(&self) -> Option<Amount> {
        self.utxos
            .values()
            .try_fold(0 as Amount, |acc, output| acc.checked_add(output.value))
    }

    /// Consume every output `tx` claims and add every output it creates.
    ///
    /// Callers validate first; this does not re-check anything.
    pub fn apply(&mut self, tx: &Transaction) {
        for outpoint in tx.claimed_refs() {
            self.utxos.remove(outpoint);
        }
        for (output, index) in tx.outputs().iter().zip(0u32..) {
            self.utxos.insert(tx.output_ref(index), *output);
        }
    }
}

impl FromIterator<(OutputRef, TxOutput)> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = (OutputRef, TxOutput)>>(iter: I) -> Self {
        UtxoPool {
            utxos: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<UtxoEntry>> for UtxoPool {
    fn from(entries: Vec<UtxoEntry>) -> Self {
        entries
            .into_iter()
            .map(|entry| (entry.outpoint, entry.output))
            .collect()
    }
}

impl From<UtxoPool> for Vec<UtxoEntry> {
    fn from(pool: UtxoPool) -> Self {
        pool.all_outputs()
            .into_iter()
            .map(|(outpoint, output)| UtxoEntry { outpoint, output })
            .collect()
    }
}

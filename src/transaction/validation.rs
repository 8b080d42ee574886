//! Validation of a single transaction against the UTXO pool
use std::collections::HashSet;

use thiserror::Error;

use crate::crypto::SignatureVerifier;
use crate::ledger::{OutputRef, UtxoPool};
use crate::transaction::types::{Amount, Transaction};

/// Why a transaction is not currently valid. This is a validation outcome,
/// not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxRejection {
    #[error("claimed output {0} is not in the UTXO pool")]
    MissingOutput(OutputRef),

    #[error("output {0} is claimed more than once")]
    DuplicateClaim(OutputRef),

    #[error("signature on input {index} does not verify for {outpoint}")]
    BadSignature { index: usize, outpoint: OutputRef },

    #[error("output {index} has negative value {value}")]
    NegativeOutput { index: usize, value: Amount },

    #[error("outputs total {outputs} exceeds inputs total {inputs}")]
    InsufficientInput { inputs: Amount, outputs: Amount },

    #[error("value sum overflowed")]
    Overflow,

    #[error("transaction has no inputs")]
    EmptyInputs,

    #[error("transaction has already been applied")]
    AlreadyApplied,

    #[error("not examined: batch limit of {0} candidates reached")]
    OverBatchLimit(usize),
}

/// Knobs on top of the five ledger rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Whether a transaction with no inputs may be valid (it can only carry
    /// zero-value outputs).
    pub allow_empty_inputs: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            allow_empty_inputs: true,
        }
    }
}

impl Transaction {
    /// Check this transaction against `pool` without modifying it.
    ///
    /// Per input, in order: the claimed output exists, it is not claimed twice,
    /// and the signature verifies under the claimed output's address. Then every
    /// output is non-negative and the outputs do not exceed the inputs.
    /// Returns the first rule that fails.
    pub fn validate<V: SignatureVerifier + ?Sized>(
        &self,
        pool: &UtxoPool,
        verifier: &V,
        policy: &ValidationPolicy,
    ) -> Result<(), TxRejection> {
        if self.inputs().is_empty() && !policy.allow_empty_inputs {
            return Err(TxRejection::EmptyInputs);
        }

        let mut claimed: HashSet<OutputRef> = HashSet::with_capacity(self.num_inputs());
        let mut input_sum: Amount = 0;

        for (index, input) in self.inputs().iter().enumerate() {
            let outpoint = input.outpoint;
            let spent = pool
                .get(&outpoint)
                .ok_or(TxRejection::MissingOutput(outpoint))?;

            if !claimed.insert(outpoint) {
                return Err(TxRejection::DuplicateClaim(outpoint));
            }

            let payload = self
                .signing_payload(index)
                .ok_or(TxRejection::BadSignature { index, outpoint })?;
            if !verifier.verify(&spent.address, &payload, &input.signature) {
                return Err(TxRejection::BadSignature { index, outpoint });
            }

            input_sum = input_sum
                .checked_add(spent.value)
                .ok_or(TxRejection::Overflow)?;
        }

        let mut output_sum: Amount = 0;
        for (index, output) in self.outputs().iter().enumerate() {
            if output.value < 0 {
                return Err(TxRejection::NegativeOutput {
                    index,
                    value: output.value,
                });
            }
            output_sum = output_sum
                .checked_add(output.value)
                .ok_or(TxRejection::Overflow)?;
        }

        if input_sum < output_sum {
            return Err(TxRejection::InsufficientInput {
                inputs: input_sum,
                outputs: output_sum,
            });
        }

        // Outputs already in the pool mean this exact transaction was applied.
        if (0..self.num_outputs() as u32).any(|index| pool.contains(&self.output_ref(index))) {
            return Err(TxRejection::AlreadyApplied);
        }

        Ok(())
    }
}

/// Boolean form of [`Transaction::validate`].
pub fn is_valid_tx<V: SignatureVerifier + ?Sized>(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &V,
    policy: &ValidationPolicy,
) -> bool {
    tx.validate(pool, verifier, policy).is_ok()
}

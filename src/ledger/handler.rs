//! Epoch resolution: pick a maximal mutually consistent subset of an
//! unordered candidate batch and apply it to the pool.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::HandlerConfig;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::ledger::pool::UtxoPool;
use crate::transaction::{Transaction, TxHash, TxRejection, ValidationPolicy};

/// A candidate left out of an epoch, with the rule it failed against the
/// final pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTx {
    pub tx: Transaction,
    pub reason: TxRejection,
}

/// Result of one epoch: the updated pool plus what was and was not accepted.
#[derive(Debug, Clone)]
pub struct EpochOutcome {
    pub pool: UtxoPool,
    /// In application order.
    pub accepted: Vec<Transaction>,
    /// In candidate order.
    pub rejected: Vec<RejectedTx>,
}

/// Resolve `candidates` against `pool`, applying accepted transactions in place.
///
/// Each round applies the first candidate, in slice order, that is valid
/// against the current pool; rounds continue until none is. Conflicts go to
/// whichever claimant comes first in the slice.
pub fn handle_txs<V: SignatureVerifier + Sync + ?Sized>(
    candidates: &[Transaction],
    pool: &mut UtxoPool,
    verifier: &V,
    config: &HandlerConfig,
) -> Vec<Transaction> {
    resolve(candidates, pool, verifier, config).0
}

/// Take ownership of `pool` for one epoch and hand it back updated.
pub fn resolve_epoch<V: SignatureVerifier + Sync + ?Sized>(
    mut pool: UtxoPool,
    candidates: &[Transaction],
    verifier: &V,
    config: &HandlerConfig,
) -> EpochOutcome {
    let (accepted, rejected) = resolve(candidates, &mut pool, verifier, config);
    EpochOutcome {
        pool,
        accepted,
        rejected,
    }
}

fn resolve<V: SignatureVerifier + Sync + ?Sized>(
    candidates: &[Transaction],
    pool: &mut UtxoPool,
    verifier: &V,
    config: &HandlerConfig,
) -> (Vec<Transaction>, Vec<RejectedTx>) {
    let policy = config.policy();
    let examined = match config.max_candidates {
        Some(limit) if limit < candidates.len() => {
            warn!(
                "Batch of {} candidates exceeds limit of {}; ignoring the rest",
                candidates.len(),
                limit
            );
            limit
        }
        _ => candidates.len(),
    };

    // Indices into `candidates`, kept in slice order.
    let mut remaining: Vec<usize> = (0..examined).collect();
    let mut accepted = Vec::new();
    let mut applied: HashSet<TxHash> = HashSet::new();

    while let Some(pos) = first_valid(
        &remaining,
        candidates,
        pool,
        &applied,
        verifier,
        &policy,
        config.parallel_scan,
    ) {
        let tx = &candidates[remaining.remove(pos)];
        pool.apply(tx);
        applied.insert(tx.hash());
        trace!(
            "Applied {} ({} inputs, {} outputs)",
            tx.hash_str(),
            tx.num_inputs(),
            tx.num_outputs()
        );
        accepted.push(tx.clone());
    }

    let mut rejected = Vec::with_capacity(candidates.len() - accepted.len());
    for idx in remaining {
        let tx = &candidates[idx];
        let reason = match tx.validate(pool, verifier, &policy) {
            Err(reason) => reason,
            Ok(()) => {
                // Only a copy of an accepted transaction can still pass here.
                debug_assert!(
                    applied.contains(&tx.hash()),
                    "valid candidate {} left over at fixed point",
                    tx.hash_str()
                );
                TxRejection::AlreadyApplied
            }
        };
        debug!("Rejected {}: {}", tx.hash_str(), reason);
        rejected.push(RejectedTx {
            tx: tx.clone(),
            reason,
        });
    }
    for tx in &candidates[examined..] {
        rejected.push(RejectedTx {
            tx: tx.clone(),
            reason: TxRejection::OverBatchLimit(examined),
        });
    }

    info!(
        "Epoch resolved: {} accepted, {} rejected, {} unspent outputs",
        accepted.len(),
        rejected.len(),
        pool.len()
    );

    (accepted, rejected)
}

/// Position in `remaining` of the first candidate valid against `pool` and
/// not already applied this epoch.
fn first_valid<V: SignatureVerifier + Sync + ?Sized>(
    remaining: &[usize],
    candidates: &[Transaction],
    pool: &UtxoPool,
    applied: &HashSet<TxHash>,
    verifier: &V,
    policy: &ValidationPolicy,
    parallel: bool,
) -> Option<usize> {
    let is_valid = |idx: &usize| {
        let tx = &candidates[*idx];
        !applied.contains(&tx.hash()) && tx.validate(pool, verifier, policy).is_ok()
    };
    if parallel {
        remaining.par_iter().position_first(is_valid)
    } else {
        remaining.iter().position(is_valid)
    }
}

/// Owns a private copy of the pool and resolves successive epochs against it.
pub struct TxHandler<V = Secp256k1Verifier> {
    pool: UtxoPool,
    verifier: V,
    config: HandlerConfig,
}

impl TxHandler {
    /// Start from a copy of `pool`; later epochs never touch the caller's pool.
    pub fn new(pool: &UtxoPool) -> Self {
        Self::with_verifier(pool.clone(), Secp256k1Verifier, HandlerConfig::default())
    }
}

impl<V: SignatureVerifier + Sync> TxHandler<V> {
    pub fn with_verifier(pool: UtxoPool, verifier: V, config: HandlerConfig) -> Self {
        TxHandler {
            pool,
            verifier,
            config,
        }
    }

    pub fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    pub fn into_pool(self) -> UtxoPool {
        self.pool
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn check_tx(&self, tx: &Transaction) -> Result<(), TxRejection> {
        tx.validate(&self.pool, &self.verifier, &self.config.policy())
    }

    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        self.check_tx(tx).is_ok()
    }

    /// Resolve one epoch and return the accepted transactions in application order.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        handle_txs(candidates, &mut self.pool, &self.verifier, &self.config)
    }

    /// Like [`TxHandler::handle_txs`], also reporting why the leftovers were rejected.
    pub fn handle_epoch(
        &mut self,
        candidates: &[Transaction],
    ) -> (Vec<Transaction>, Vec<RejectedTx>) {
        resolve(candidates, &mut self.pool, &self.verifier, &self.config)
    }
}

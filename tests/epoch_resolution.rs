//! Integration tests for transaction validation and epoch resolution
//!
//! Every transaction here is signed with real secp256k1 keys.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use scroogecoin::config::HandlerConfig;
use scroogecoin::crypto::{KeyPair, Secp256k1Verifier};
use scroogecoin::ledger::{handle_txs, resolve_epoch, OutputRef, TxHandler, UtxoPool};
use scroogecoin::transaction::{
    is_valid_tx, Transaction, TransactionBuilder, TxOutput, TxRejection, ValidationPolicy,
};
use std::collections::HashSet;

const GENESIS: [u8; 32] = [0x5C; 32];

fn key(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes(&[seed; 32]).unwrap()
}

fn ref0() -> OutputRef {
    OutputRef::new(GENESIS, 0)
}

/// pool = {ref0 -> (A, 10)}
fn single_output_pool(owner: &KeyPair) -> UtxoPool {
    [(ref0(), TxOutput::new(10, owner.address()))]
        .into_iter()
        .collect()
}

fn valid(tx: &Transaction, pool: &UtxoPool) -> bool {
    is_valid_tx(tx, pool, &Secp256k1Verifier, &ValidationPolicy::default())
}

#[test]
fn test_split_payment_then_conflict() {
    let (a, b, c) = (key(1), key(2), key(3));
    let pool = single_output_pool(&a);

    let tx1 = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(4, b.address())
        .output(6, c.address())
        .sign_all(&a)
        .unwrap()
        .build();
    let tx2 = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, c.address())
        .sign_all(&a)
        .unwrap()
        .build();

    assert!(valid(&tx1, &pool));
    assert!(valid(&tx2, &pool));

    let mut handler = TxHandler::new(&pool);
    let accepted = handler.handle_txs(&[tx1.clone(), tx2.clone()]);

    assert_eq!(accepted, vec![tx1.clone()]);
    let expected: UtxoPool = [
        (OutputRef::new(tx1.hash(), 0), TxOutput::new(4, b.address())),
        (OutputRef::new(tx1.hash(), 1), TxOutput::new(6, c.address())),
    ]
    .into_iter()
    .collect();
    assert_eq!(handler.pool(), &expected);
}

#[test]
fn test_conflict_winner_follows_scan_order() {
    let (a, b, c) = (key(1), key(2), key(3));
    let pool = single_output_pool(&a);
    let to_b = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, b.address())
        .sign_all(&a)
        .unwrap()
        .build();
    let to_c = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, c.address())
        .sign_all(&a)
        .unwrap()
        .build();

    let mut forward = pool.clone();
    let accepted = handle_txs(
        &[to_b.clone(), to_c.clone()],
        &mut forward,
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert_eq!(accepted, vec![to_b.clone()]);

    let mut backward = pool;
    let accepted = handle_txs(
        &[to_c.clone(), to_b],
        &mut backward,
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert_eq!(accepted, vec![to_c]);
}

#[test]
fn test_chained_dependency_listed_out_of_order() {
    let (a, b, c) = (key(1), key(2), key(3));
    let pool = single_output_pool(&a);

    let tx_a = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, b.address())
        .sign_all(&a)
        .unwrap()
        .build();
    let tx_b = TransactionBuilder::new()
        .input(tx_a.hash(), 0)
        .output(10, c.address())
        .sign_all(&b)
        .unwrap()
        .build();

    assert!(!valid(&tx_b, &pool));

    let outcome = resolve_epoch(
        pool,
        &[tx_b.clone(), tx_a.clone()],
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );

    assert_eq!(outcome.accepted, vec![tx_a, tx_b.clone()]);
    assert!(outcome.rejected.is_empty());
    let expected: UtxoPool = [(OutputRef::new(tx_b.hash(), 0), TxOutput::new(10, c.address()))]
        .into_iter()
        .collect();
    assert_eq!(outcome.pool, expected);
}

#[test]
fn test_reapplying_accepted_tx_fails() {
    let a = key(1);
    let mut pool = single_output_pool(&a);
    let tx = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, key(2).address())
        .sign_all(&a)
        .unwrap()
        .build();

    let accepted = handle_txs(
        &[tx.clone()],
        &mut pool,
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert_eq!(accepted.len(), 1);
    assert!(!valid(&tx, &pool));

    let again = handle_txs(
        &[tx],
        &mut pool,
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert!(again.is_empty());
}

#[test]
fn test_same_tx_twice_in_batch_accepted_once() {
    let a = key(1);
    let tx = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(10, key(2).address())
        .sign_all(&a)
        .unwrap()
        .build();

    let outcome = resolve_epoch(
        single_output_pool(&a),
        &[tx.clone(), tx.clone()],
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert_eq!(outcome.accepted, vec![tx]);
    assert_eq!(outcome.rejected.len(), 1);
}

#[test]
fn test_zero_input_tx_twice_in_batch_applied_once() {
    let tx = TransactionBuilder::new()
        .output(0, key(1).address())
        .build();

    let outcome = resolve_epoch(
        UtxoPool::new(),
        &[tx.clone(), tx.clone()],
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );

    assert_eq!(outcome.accepted, vec![tx.clone()]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].reason, TxRejection::AlreadyApplied);
    assert_eq!(outcome.pool.len(), 1);
    assert!(!valid(&tx, &outcome.pool));
}

#[test]
fn test_all_inputs_absent() {
    let a = key(1);
    let pool = single_output_pool(&a);
    let tx = TransactionBuilder::new()
        .input([0x01; 32], 0)
        .input([0x02; 32], 1)
        .output(1, a.address())
        .sign_all(&a)
        .unwrap()
        .build();

    assert!(!valid(&tx, &pool));
}

#[test]
fn test_duplicate_claim_invalid_despite_enough_value() {
    let a = key(1);
    let pool = single_output_pool(&a);
    let tx = TransactionBuilder::new()
        .input(GENESIS, 0)
        .input(GENESIS, 0)
        .output(5, a.address())
        .sign_all(&a)
        .unwrap()
        .build();

    assert!(!valid(&tx, &pool));
}

#[test]
fn test_negative_output_invalid() {
    let a = key(1);
    let pool = single_output_pool(&a);
    let tx = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(-1, a.address())
        .sign_all(&a)
        .unwrap()
        .build();

    assert!(!valid(&tx, &pool));
}

#[test]
fn test_conservation_boundary() {
    let a = key(1);
    let pool = single_output_pool(&a);
    let equal = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(3, a.address())
        .output(7, a.address())
        .sign_all(&a)
        .unwrap()
        .build();
    let over = TransactionBuilder::new()
        .input(GENESIS, 0)
        .output(3, a.address())
        .output(8, a.address())
        .sign_all(&a)
        .unwrap()
        .build();

    assert!(valid(&equal, &pool));
    assert!(!valid(&over, &pool));
}

#[test]
fn test_zero_input_zero_value_edge_case() {
    let tx = TransactionBuilder::new()
        .output(0, key(1).address())
        .build();

    let lenient = resolve_epoch(
        UtxoPool::new(),
        &[tx.clone()],
        &Secp256k1Verifier,
        &HandlerConfig::default(),
    );
    assert_eq!(lenient.accepted, vec![tx.clone()]);
    assert!(lenient.pool.contains(&tx.output_ref(0)));

    let strict = HandlerConfig {
        allow_empty_inputs: false,
        ..HandlerConfig::default()
    };
    let outcome = resolve_epoch(UtxoPool::new(), &[tx], &Secp256k1Verifier, &strict);
    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.rejected[0].reason, TxRejection::EmptyInputs);
}

/// A batch of up to 12 random spends over the genesis outputs and each
/// other's outputs, some overspending and some claiming an output twice.
fn random_batch(
    rng: &mut StdRng,
    owner: &KeyPair,
    genesis: &[(OutputRef, i64)],
) -> Vec<Transaction> {
    let mut spendable = genesis.to_vec();
    let mut batch = Vec::new();
    for _ in 0..12 {
        let mut builder = TransactionBuilder::new();
        let mut total = 0;
        for _ in 0..rng.gen_range(1..=2) {
            let (outpoint, value) = spendable[rng.gen_range(0..spendable.len())];
            builder = builder.input(outpoint.tx_hash, outpoint.index);
            total += value;
        }
        let budget = if rng.gen_bool(0.2) { total + 1 } else { total };
        let first = rng.gen_range(0..=budget);
        let tx = builder
            .output(first, owner.address())
            .output(budget - first, owner.address())
            .sign_all(owner)
            .unwrap()
            .build();
        spendable.push((tx.output_ref(0), first));
        spendable.push((tx.output_ref(1), budget - first));
        batch.push(tx);
    }
    batch
}

#[test]
fn test_random_batches_are_conflict_safe_and_replayable() {
    let owner = key(7);
    let genesis: Vec<(OutputRef, i64)> = (0..4)
        .map(|index| (OutputRef::new(GENESIS, index), 10 * (index as i64 + 1)))
        .collect();
    let initial: UtxoPool = genesis
        .iter()
        .map(|(outpoint, value)| (*outpoint, TxOutput::new(*value, owner.address())))
        .collect();

    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut candidates = random_batch(&mut rng, &owner, &genesis);
        candidates.shuffle(&mut rng);

        let outcome = resolve_epoch(
            initial.clone(),
            &candidates,
            &Secp256k1Verifier,
            &HandlerConfig::default(),
        );

        // Pairwise-disjoint claims.
        let mut claimed = HashSet::new();
        for tx in &outcome.accepted {
            for outpoint in tx.claimed_refs() {
                assert!(claimed.insert(*outpoint), "seed {}: {} spent twice", seed, outpoint);
            }
        }

        // Each accepted tx was valid right before it was applied.
        let mut replay = initial.clone();
        for tx in &outcome.accepted {
            assert!(valid(tx, &replay), "seed {}: {} invalid at its turn", seed, tx.hash_str());
            replay.apply(tx);
        }
        assert_eq!(replay, outcome.pool);

        // Fixed point: nothing left over is valid.
        for rejected in &outcome.rejected {
            assert!(!valid(&rejected.tx, &outcome.pool));
        }
        assert_eq!(
            outcome.accepted.len() + outcome.rejected.len(),
            candidates.len()
        );

        assert!(outcome.pool.total_value().unwrap() <= initial.total_value().unwrap());
    }
}

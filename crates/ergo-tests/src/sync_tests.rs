//! Light client sync tests.
//!
//! A verifier fed by several peers: honest peers serving the same chain,
//! adversaries serving forks, and peers racing from different threads.

use crate::generators::*;
use crate::harness::*;
use ergo_nipopow::{NipopowProof, NipopowVerifier, PoPowHeader, ProcessOutcome, VerifierConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::thread;

/// Honest chain plus an adversarial branch forking at `shared` that is
/// as long but has no superblocks.
fn honest_and_adversary(
    seed: u64,
    shared: usize,
    branch: usize,
) -> (Vec<PoPowHeader>, Vec<PoPowHeader>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = random_chain(&mut rng, shared);
    let mut honest_levels = random_levels(&mut rng, branch);
    // Every other honest header is a level-5 superblock.
    for level in honest_levels.iter_mut().step_by(2) {
        *level = (*level).max(5);
    }
    let honest = extend_chain(&base, &honest_levels, 1);
    let adversary = extend_chain(&base, &vec![0; branch], 2);
    (honest, adversary)
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_two_peers_same_tip_converge() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(11);
    let chain = random_chain(&mut rng, 120);
    // Peers serving the same chain with their own parameters.
    let peer_a = prove(&chain, 4, 4).unwrap();
    let peer_b = prove(&chain, 6, 5).unwrap();
    assert_ne!(peer_a.headers_chain(), peer_b.headers_chain());

    let mut first = test_verifier(chain[0].id());
    process_all(&mut first, &[peer_a.clone(), peer_b.clone()]);
    let mut second = test_verifier(chain[0].id());
    process_all(&mut second, &[peer_b, peer_a]);

    let tip = chain.last().map(|h| h.id());
    for verifier in [&first, &second] {
        assert_eq!(verifier.best_chain().last().map(|h| h.id), tip);
        assert_eq!(verifier.best_height(), Some(120));
        assert_eq!(verifier.proofs_processed(), 2);
    }
}

#[test]
fn test_honest_chain_wins_in_any_order() {
    let (honest, adversary) = honest_and_adversary(5, 30, 40);
    let honest_proof = prove(&honest, 3, 3).unwrap();
    let adversary_proof = prove(&adversary, 3, 3).unwrap();
    assert!(honest_proof.is_better_than(&adversary_proof).unwrap());
    assert!(!adversary_proof.is_better_than(&honest_proof).unwrap());

    for order in [
        vec![honest_proof.clone(), adversary_proof.clone()],
        vec![adversary_proof.clone(), honest_proof.clone()],
    ] {
        let mut verifier = test_verifier(honest[0].id());
        process_all(&mut verifier, &order);
        assert_eq!(verifier.best_proof(), Some(&honest_proof));
        assert_eq!(verifier.proofs_processed(), 2);
    }
}

#[test]
fn test_longer_honest_chain_replaces_stale_proof() {
    // Ruler sequence: the header at height h + 1 has level trailing_zeros(h).
    let levels: Vec<u32> = (0..150u32).map(u32::trailing_zeros).collect();
    let chain = generate_chain(&levels);
    let stale = prove(&chain[..100], 4, 4).unwrap();
    let fresh = prove(&chain, 4, 4).unwrap();

    let mut verifier = test_verifier(chain[0].id());
    let outcomes = process_all(&mut verifier, &[stale.clone(), fresh.clone(), stale]);
    assert!(matches!(outcomes[0], ProcessOutcome::BetterChain { .. }));
    assert!(matches!(outcomes[1], ProcessOutcome::BetterChain { .. }));
    assert_eq!(outcomes[2], ProcessOutcome::NoBetterChain { proofs_processed: 3 });
    assert_eq!(verifier.best_proof(), Some(&fresh));
}

#[test]
fn test_repeated_proof_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(21);
    let chain = random_chain(&mut rng, 60);
    let proof = prove(&chain, 3, 3).unwrap();

    let mut verifier = test_verifier(chain[0].id());
    verifier.process(proof.clone()).unwrap();
    let best = verifier.best_chain();
    for _ in 0..3 {
        assert!(matches!(
            verifier.process(proof.clone()).unwrap(),
            ProcessOutcome::NoBetterChain { .. }
        ));
        assert_eq!(verifier.best_chain(), best);
    }
}

// ============================================================================
// Quorum
// ============================================================================

#[test]
fn test_quorum_across_peers() {
    let ctx = TestContext::new();
    let (honest, adversary) = honest_and_adversary(9, 20, 30);
    let mut config = VerifierConfig::for_genesis(honest[0].id());
    config.min_proofs = 3;
    let mut verifier = ctx.verifier_from_file(&config);

    verifier.process(prove(&adversary, 3, 3).unwrap()).unwrap();
    assert!(verifier.headers_to_apply().is_none());
    verifier.process(prove(&honest, 3, 3).unwrap()).unwrap();
    assert!(!verifier.has_quorum());
    verifier.process(prove(&honest, 3, 3).unwrap()).unwrap();

    let headers = verifier.headers_to_apply().unwrap();
    assert_eq!(headers.last().map(|h| h.id), Some(honest.last().unwrap().id()));
}

// ============================================================================
// Concurrent peers
// ============================================================================

#[test]
fn test_shared_verifier_with_racing_peers() {
    let (honest, adversary) = honest_and_adversary(13, 25, 35);
    let honest_proof = prove(&honest, 3, 3).unwrap();
    let mut proofs: Vec<NipopowProof> = (0..4)
        .map(|_| prove(&adversary, 3, 3).unwrap())
        .chain((0..4).map(|_| honest_proof.clone()))
        .collect();
    proofs.shuffle(&mut StdRng::seed_from_u64(1));

    let shared = shared_verifier(honest[0].id());
    let handles: Vec<_> = proofs
        .into_iter()
        .map(|proof| {
            let shared = shared.clone();
            thread::spawn(move || shared.process(proof).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shared.proofs_processed(), 8);
    assert_eq!(shared.best_proof(), Some(honest_proof));
    assert_eq!(
        shared.find_header(&honest.last().unwrap().id()).map(|h| h.height),
        Some(honest.len() as u32)
    );
}

#[test]
fn test_verifier_for_other_network_ignores_peers() {
    let (honest, _) = honest_and_adversary(3, 10, 10);
    let other = extend_chain(&[], &[0; 10], 77);
    let mut verifier = NipopowVerifier::new(other[0].id());

    assert!(verifier.process(prove(&honest, 2, 2).unwrap()).is_err());
    assert!(verifier.process(prove(&other, 2, 2).unwrap()).is_ok());
    assert_eq!(verifier.best_height(), Some(10));
}

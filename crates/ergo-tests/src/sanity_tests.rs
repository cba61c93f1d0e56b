//! Sanity tests for the light client pipeline.
//!
//! These tests verify fundamental functionality like:
//! - Proving a chain, shipping the proof as JSON and verifying it
//! - Transaction inclusion against the best chain
//! - Known fixtures for Merkle and interlinks proofs

use crate::generators::*;
use crate::harness::*;
use ergo_merkle::{BatchMerkleProof, Digest32, MerkleProof, NodeSide};
use ergo_nipopow::{
    pack_interlinks, BlockHeader, Extension, ExtensionField, NipopowProof, PoPowHeader,
    ProcessOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const MERKLE_FIXTURE: &str = r#"{
    "leafData": "563b34b96e65788d767a10b0c2ce4a9ef5dcb9f7f7919781624870d56506dc5b",
    "levels": [
        ["274d105b42c2da3e03519865470ccef5072d389b153535ca7192fef4abf3b3ed", 0],
        ["c1887cee0c42318ac04dfa93b8ef6b40c2b53a83b0e111f91a16b0842166e76e", 0],
        ["58be076cd9ef596a739ec551cbb6b467b95044c05a80a66a7f256d4ebafd787f", 0]
    ]
}"#;

const MERKLE_FIXTURE_ROOT: &str =
    "250063ac1cec3bf56f727f644f49b70515616afa6009857a29b1fe298441e69a";

const POPOW_HEADER_FIXTURE: &str =
    include_str!("../../ergo-nipopow/tests/fixtures/popow_header.json");

/// A random chain proven, encoded, decoded and verified end to end.
#[test]
fn test_prove_encode_verify_pipeline() {
    let mut rng = StdRng::seed_from_u64(42);
    let chain = random_chain(&mut rng, 300);
    let proof = prove(&chain, 6, 6).unwrap();
    assert!(proof.is_valid());
    assert!(proof.prefix.len() + proof.suffix.len() < chain.len());

    let decoded = NipopowProof::from_json(&proof.to_json().unwrap()).unwrap();
    assert_eq!(decoded, proof);

    let mut verifier = test_verifier(chain[0].id());
    let outcome = verifier.process(decoded).unwrap();
    assert_eq!(outcome, ProcessOutcome::BetterChain { proofs_processed: 1 });
    assert_eq!(verifier.best_height(), Some(300));

    let best = verifier.best_chain();
    assert_eq!(best.first().map(|h| h.id), Some(chain[0].id()));
    assert!(best.windows(2).all(|w| w[0].height < w[1].height));
    for header in &best {
        let original = &chain[header.height as usize - 1].header;
        assert_eq!(header, original);
        assert!(header.verify_id().is_ok());
    }
}

/// Transactions in a header of the best chain can be checked by id.
#[test]
fn test_transaction_inclusion_in_best_chain() {
    let mut rng = StdRng::seed_from_u64(3);
    let leaves = random_leaves(&mut rng, 7);
    let tree = tree_of(&leaves);
    let root = tree.root_hash();

    let chain = extend_chain_with(&[], &[0; 20], 0, |height| {
        if height == 20 {
            root
        } else {
            Digest32::zero()
        }
    });
    let tip = chain[19].id();

    let mut verifier = test_verifier(chain[0].id());
    verifier.process(prove(&chain, 3, 3).unwrap()).unwrap();

    for (i, leaf) in leaves.iter().enumerate() {
        let proof = tree.proof_by_index(i).unwrap();
        assert_eq!(proof.leaf_data(), leaf.as_slice());
        assert!(verifier.verify_transaction(&tip, &proof));
        assert!(!verifier.verify_transaction(&chain[18].id(), &proof));
    }

    let mut forged = tree.proof_by_index(0).unwrap().levels().to_vec();
    forged.reverse();
    let forged = MerkleProof::with_levels(leaves[0].clone(), forged);
    assert!(!verifier.verify_transaction(&tip, &forged));
}

/// The node's sample proof validates against its root.
#[test]
fn test_merkle_fixture() {
    let proof = MerkleProof::from_json(MERKLE_FIXTURE).unwrap();
    assert_eq!(proof.levels().len(), 3);
    assert!(proof.valid_hex(MERKLE_FIXTURE_ROOT).unwrap());

    let root: Digest32 = MERKLE_FIXTURE_ROOT.parse().unwrap();
    let mut header = header_at_level(10, Digest32::zero(), 0, Digest32::zero(), 0);
    header.transactions_root = root;
    assert!(header.contains_transaction(&proof));

    let reencoded = MerkleProof::from_json(&proof.to_json().unwrap()).unwrap();
    assert_eq!(reencoded, proof);
}

/// Interlinks proof with an empty sibling entry.
///
/// The fixture is generated locally, not captured from mainnet: it has the
/// shape of the node's sample header (`fa31f25f...d0a3`), three interlinks
/// and one empty-digest proof entry with side 1, but its own header bytes.
#[test]
fn test_popow_header_fixture() {
    let popow = PoPowHeader::from_json(POPOW_HEADER_FIXTURE).unwrap();
    assert_eq!(popow.interlinks.len(), 3);
    assert_eq!(popow.interlinks_proof.proofs().len(), 1);
    assert!(popow.interlinks_proof.proofs()[0].hash.is_none());
    assert_eq!(popow.interlinks_proof.proofs()[0].side, NodeSide::Right);
    assert!(popow.check_interlinks_proof());
    assert!(popow.header.verify_id().is_ok());
}

/// Interlinks proven out of an extension holding other fields too.
#[test]
fn test_extension_batch_proof() {
    let chain = generate_chain(&[0, 1, 2, 0, 3, 0]);
    let interlinks = chain[5].interlinks.clone();

    let mut fields = vec![
        ExtensionField::new([0x00, 0x01], vec![0, 0, 0, 100]),
        ExtensionField::new([0x00, 0x02], vec![1; 8]),
    ];
    fields.extend(pack_interlinks(&interlinks));
    fields.push(ExtensionField::new([0x02, 0x00], vec![7; 40]));
    let extension = Extension::new(chain[5].id(), fields);

    let proof = extension.interlinks_proof().unwrap();
    assert!(proof.valid(&extension.digest()));
    let decoded = BatchMerkleProof::from_json(&proof.to_json().unwrap()).unwrap();
    assert_eq!(decoded, proof);

    let mut header = chain[5].header.clone();
    header.extension_root = extension.digest();
    let popow = PoPowHeader::from_block(header, &extension).unwrap();
    assert_eq!(popow.interlinks, interlinks);
    assert!(popow.check_interlinks_proof());

    let decoded_ext = Extension::from_json(&extension.to_json().unwrap()).unwrap();
    assert_eq!(decoded_ext.digest(), extension.digest());
}

/// The node's `suffixHead` / `suffixTail` layout is accepted.
#[test]
fn test_node_proof_layout() {
    let chain = generate_chain(&[0, 0, 1, 0, 2, 0, 0, 0, 1, 0]);
    let proof = prove(&chain, 2, 3).unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&proof.to_json().unwrap()).unwrap();
    let suffix = value["suffix"].as_array().cloned().unwrap();
    let tail: Vec<serde_json::Value> = suffix[1..].iter().map(|p| p["header"].clone()).collect();
    let object = value.as_object_mut().unwrap();
    object.remove("suffix");
    object.insert("suffixHead".to_string(), suffix[0].clone());
    object.insert("suffixTail".to_string(), serde_json::Value::Array(tail));

    let node_proof = NipopowProof::from_json(&value.to_string()).unwrap();
    assert_eq!(node_proof.k, 3);
    assert_eq!(node_proof.headers_chain(), proof.headers_chain());

    let mut verifier = test_verifier(chain[0].id());
    verifier.process(node_proof).unwrap();
    assert_eq!(verifier.best_height(), Some(10));
}

/// Header JSON as served by the node decodes and keeps its id.
#[test]
fn test_header_json_roundtrip() {
    let chain = generate_chain(&[0, 3, 0]);
    let json = chain[2].header.to_json().unwrap();
    let header = BlockHeader::from_json(&json).unwrap();
    assert_eq!(header, chain[2].header);
    assert_eq!(header.compute_id().unwrap(), chain[2].id());
}

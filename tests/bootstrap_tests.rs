//! Bringing up an engine from a settings file.

use dpos_rs::prelude::*;
use dpos_rs::BootstrapError;
use num_bigint::BigInt;
use std::io::Write;
use tempfile::NamedTempFile;

fn key(fill: u8) -> PublicKey {
    let mut bytes = [fill; 33];
    bytes[0] = 0x02;
    PublicKey::from_bytes(bytes).unwrap()
}

fn settings_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_bootstrap_applies_and_reverts_genesis() {
    let file = settings_file(
        r#"
        [engine]
        genesis_height = 1
        forged_history_depth = 4

        [network]
        name = "devnet"

        [logging]
        level = "warn"
        format = "compact"
        color = false
        "#,
    );

    let mut engine = dpos_rs::bootstrap(file.path()).unwrap();
    assert_eq!(engine.config().forged_history_depth, 4);

    let producer = key(0xf1);
    let wallet = key(0xf0);
    let holder = engine.ledger().derive_address(&key(0x01));
    let id = |value: &str| TransactionId::new(value).unwrap();

    let genesis = Block {
        id: "genesis".to_string(),
        height: 1,
        timestamp: 1_600_000_000,
        generator_public_key: producer,
        reward: BigInt::from(0),
        total_fee: BigInt::from(0),
        transactions: vec![
            Transaction::delegate_registration(id("g-0"), producer, "genesis", BigInt::from(0)),
            Transaction::transfer(id("g-1"), wallet, holder.clone(), BigInt::from(500), BigInt::from(0)),
        ],
    };

    let before = engine.ledger().snapshot();
    engine.apply_block(&genesis).unwrap();
    assert_eq!(engine.height(), 1);
    assert_eq!(
        engine.ledger().find_by_address(&holder).unwrap().balance(),
        &BigInt::from(500)
    );
    assert!(engine.ledger().find_by_username("genesis").is_ok());

    engine.revert_block(&genesis).unwrap();
    assert_eq!(engine.ledger().snapshot(), before);
}

#[test]
fn test_bootstrap_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = dpos_rs::bootstrap(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
}

#[test]
fn test_bootstrap_rejects_invalid_settings() {
    let file = settings_file("[engine]\ngenesis_height = 0\n");
    let err = dpos_rs::bootstrap(file.path()).unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
    assert!(err.to_string().contains("genesis_height"));
}

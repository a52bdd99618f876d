//! End-to-end flows through the public API: key lifecycle across storage,
//! role separation over one ciphertext, and submission against a chain
//! double.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use common::{curator, success_receipt, whitelist, StubChain, WETH};
use orion_sdk::{
    submit_order_intent, ContextStore, EncryptedOrderIntent, EncryptionContext, EngineConfig,
    EvalOp, FsContextStore, HomomorphicEvaluator, IntentDecryptor, IntentEncryptor,
    IntentValidator, LocalProver, PublicContext, SecretContext, TransactionEngine,
    TransactionError,
};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("orion-flow-{tag}-{}", std::process::id()))
}

#[test]
fn key_lifecycle_across_storage_and_roles() {
    // Operator generates a context and distributes the halves through
    // separate stores.
    let mut rng = StdRng::seed_from_u64(2024);
    let context = EncryptionContext::generate(&mut rng);
    let (public, secret) = context.into_halves();

    let public_store = FsContextStore::new(temp_dir("public"));
    let secret_store = FsContextStore::new(temp_dir("secret"));
    public.save(&public_store).unwrap();
    secret.save(&secret_store).unwrap();

    // Curator: validate and encrypt with the public half only.
    let public = PublicContext::load(&public_store).unwrap();
    let raw = BTreeMap::from([(WETH.to_string(), 5i128)]);
    let intent = IntentValidator::new(whitelist()).validate(&raw).unwrap();
    let encryptor = IntentEncryptor::new(&public);
    let encrypted = encryptor.encrypt_order_intent(&intent, &mut rng);
    let sealed = EncryptedOrderIntent::seal(
        &encrypted,
        public.params(),
        &LocalProver,
        curator().address(),
        "0x000000000000000000000000000000000000dEaD".parse().unwrap(),
    )
    .unwrap();
    assert_eq!(sealed.items.len(), 1);

    // Compute server: weight the encrypted amount, public half only.
    let evaluator = HomomorphicEvaluator::new(&public);
    let asset: alloy::primitives::Address = WETH.parse().unwrap();
    let weighted = evaluator
        .evaluate(&encrypted[&asset], EvalOp::ScaleBy(10))
        .unwrap();

    // Decryptor: recover the weighted amount with the secret half.
    let secret = SecretContext::load(&secret_store).unwrap();
    let decryptor = IntentDecryptor::new(&secret);
    let value = decryptor.decrypt(&weighted).unwrap();
    assert!((value - 50.0).abs() < 1e-3, "5 * 10 decrypted to {value}");
}

#[test]
fn corrupted_stored_context_fails_to_load() {
    let mut rng = StdRng::seed_from_u64(2025);
    let context = EncryptionContext::generate(&mut rng);
    let store = FsContextStore::new(temp_dir("corrupt"));
    context.secret.save(&store).unwrap();

    let mut blob = store.get(orion_sdk::keystore::SECRET_CONTEXT_SLOT).unwrap();
    blob.truncate(blob.len() - 1);
    store
        .put(orion_sdk::keystore::SECRET_CONTEXT_SLOT, &blob)
        .unwrap();

    assert!(matches!(
        SecretContext::load(&store),
        Err(orion_sdk::ContextError::Corrupt(_))
    ));
}

#[test]
fn plain_submission_confirms_against_the_chain() {
    let chain = StubChain::default();
    chain.state.lock().unwrap().receipt = Some(success_receipt(vec![]));
    let engine = TransactionEngine::with_config(
        chain,
        EngineConfig {
            confirmation_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
        },
    );

    let raw = BTreeMap::from([(WETH.to_string(), 1_000_000i128)]);
    let intent = IntentValidator::new(whitelist()).validate(&raw).unwrap();
    let result = submit_order_intent(
        &engine,
        &curator(),
        "0x000000000000000000000000000000000000dEaD".parse().unwrap(),
        &intent,
    )
    .unwrap();
    assert!(result.receipt.is_success());
    assert_eq!(engine.rpc().state.lock().unwrap().broadcasts.len(), 1);
}

#[test]
fn estimation_failure_never_broadcasts() {
    let chain = StubChain::default();
    chain.state.lock().unwrap().gas_estimate = Err(orion_sdk::RpcError::Rpc {
        code: 3,
        message: "execution reverted".into(),
    });
    let engine = TransactionEngine::with_config(
        chain,
        EngineConfig {
            confirmation_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
        },
    );

    let raw = BTreeMap::from([(WETH.to_string(), 1i128)]);
    let intent = IntentValidator::new(whitelist()).validate(&raw).unwrap();
    let err = submit_order_intent(
        &engine,
        &curator(),
        "0x000000000000000000000000000000000000dEaD".parse().unwrap(),
        &intent,
    )
    .unwrap_err();
    assert!(matches!(err, TransactionError::EstimationFailed(_)));
    assert!(engine.rpc().state.lock().unwrap().broadcasts.is_empty());
}

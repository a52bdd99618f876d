//! Command handlers for the Orion CLI.
//!
//! Each match arm implements the logic for one command. Chain endpoints and
//! credentials come from the environment; the handlers fetch a fresh
//! whitelist snapshot per submission, since the whitelist may change between two
//! independent runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use rand::thread_rng;

use orion_sdk::chain::contracts;
use orion_sdk::{
    order_intent_from_json, order_intent_from_table, Ciphertext, EncryptedOrderIntent,
    EncryptionContext, EvalOp, FsContextStore, FuzzConfig, HomomorphicEvaluator, HttpRpc,
    IntentDecryptor, IntentEncryptor, IntentValidator, LocalProver, OrionConfigReader,
    PublicContext, SecretContext, TransactionEngine, VaultDeployment, VaultKind,
};

use super::commands::{Commands, FeeTypeArg, SubmitOrder, VaultTypeArg};
use super::output::{print_transaction_error, print_transaction_result};

type CliError = Box<dyn std::error::Error>;

/// Environment-provided endpoints and credentials.
struct Settings;

impl Settings {
    fn var(name: &str) -> Result<String, CliError> {
        std::env::var(name).map_err(|_| format!("{name} environment variable is not set").into())
    }

    fn rpc_url() -> Result<String, CliError> {
        Self::var("RPC_URL")
    }

    fn address(name: &str) -> Result<Address, CliError> {
        Ok(Self::var(name)?
            .parse()
            .map_err(|err| format!("{name}: {err}"))?)
    }

    fn signer(name: &str) -> Result<PrivateKeySigner, CliError> {
        Ok(Self::var(name)?
            .parse::<PrivateKeySigner>()
            .map_err(|err| format!("{name}: {err}"))?)
    }
}

/// Execute a CLI command.
pub fn execute(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::DeployVault {
            vault_type,
            name,
            symbol,
            fee_type,
            performance_fee,
            management_fee,
        } => {
            let rpc = HttpRpc::new(Settings::rpc_url()?)?;
            let engine = TransactionEngine::new(rpc);
            let signer = Settings::signer("DEPLOYER_PRIVATE_KEY")?;
            let factory = Settings::address("FACTORY_ADDRESS")?;
            let curator = Settings::address("CURATOR_ADDRESS")
                .unwrap_or_else(|_| signer.address());

            let kind = match vault_type {
                VaultTypeArg::Transparent => VaultKind::Transparent,
                VaultTypeArg::Encrypted => VaultKind::Encrypted,
            };
            let deployment = VaultDeployment {
                curator,
                name,
                symbol,
                fee_type: match fee_type {
                    FeeTypeArg::Flat => contracts::FeeType::Flat,
                    FeeTypeArg::HighWaterMark => contracts::FeeType::HighWaterMark,
                },
                performance_fee_bps: performance_fee,
                management_fee_bps: management_fee,
            };

            println!("Deploying {kind:?} vault...");
            match contracts::deploy_vault(&engine, &signer, factory, kind, &deployment) {
                Ok(result) => {
                    print_transaction_result(&result);
                    match orion_sdk::chain::vault_address_from_logs(&result.decoded_logs) {
                        Some(vault) => println!(
                            "Vault deployed at {}; add this to your environment to interact with it",
                            vault.to_checksum(None)
                        ),
                        None => println!("Could not extract a vault address from the transaction"),
                    }
                    Ok(())
                }
                Err(err) => {
                    print_transaction_error(&err);
                    Err(err.into())
                }
            }
        }

        Commands::SubmitOrder(SubmitOrder::Plain { order_intent_path }) => {
            let rpc = HttpRpc::new(Settings::rpc_url()?)?;
            let raw = read_raw_intent(&order_intent_path)?;
            let config = OrionConfigReader::new(&rpc, Settings::address("CONFIG_ADDRESS")?);
            let snapshot = config.whitelist_snapshot()?;
            let intent = IntentValidator::new(snapshot).validate(&raw)?;

            let engine = TransactionEngine::new(rpc);
            let signer = Settings::signer("CURATOR_PRIVATE_KEY")?;
            let vault = Settings::address("ORION_VAULT_ADDRESS")?;
            match contracts::submit_order_intent(&engine, &signer, vault, &intent) {
                Ok(result) => {
                    print_transaction_result(&result);
                    Ok(())
                }
                Err(err) => {
                    print_transaction_error(&err);
                    Err(err.into())
                }
            }
        }

        Commands::SubmitOrder(SubmitOrder::Encrypted {
            order_intent_path,
            fuzz,
            seed,
            public_dir,
        }) => {
            let rpc = HttpRpc::new(Settings::rpc_url()?)?;
            let raw = read_raw_intent(&order_intent_path)?;
            let config = OrionConfigReader::new(&rpc, Settings::address("CONFIG_ADDRESS")?);
            let snapshot = config.whitelist_snapshot()?;
            let mut validator = IntentValidator::new(snapshot);
            if fuzz {
                validator = validator.with_fuzz(FuzzConfig { seed });
            }
            let intent = validator.validate(&raw)?;

            let store = FsContextStore::new(public_dir);
            let public = PublicContext::load(&store)?;
            let encryptor = IntentEncryptor::new(&public);
            let encrypted = encryptor.encrypt_order_intent(&intent, &mut thread_rng());

            let signer = Settings::signer("CURATOR_PRIVATE_KEY")?;
            let vault = Settings::address("ORION_VAULT_ADDRESS")?;
            let sealed = EncryptedOrderIntent::seal(
                &encrypted,
                public.params(),
                &LocalProver,
                signer.address(),
                vault,
            )?;

            let engine = TransactionEngine::new(rpc);
            match contracts::submit_encrypted_order_intent(&engine, &signer, vault, &sealed) {
                Ok(result) => {
                    print_transaction_result(&result);
                    Ok(())
                }
                Err(err) => {
                    print_transaction_error(&err);
                    Err(err.into())
                }
            }
        }

        Commands::Keygen {
            public_dir,
            secret_dir,
        } => {
            println!("Generating encryption context...");
            let context = EncryptionContext::generate(&mut thread_rng());
            let (public, secret) = context.into_halves();
            public.save(&FsContextStore::new(public_dir.clone()))?;
            secret.save(&FsContextStore::new(secret_dir.clone()))?;
            println!("✓ Public context written under {}", public_dir.display());
            println!(
                "✓ Secret context written under {}; keep this half away from \
                 encryptor and evaluator hosts",
                secret_dir.display()
            );
            Ok(())
        }

        Commands::Evaluate {
            ciphertext,
            public_dir,
            scale,
            output,
        } => {
            let public = PublicContext::load(&FsContextStore::new(public_dir))?;
            let blob = fs::read(&ciphertext)?;
            let ct = Ciphertext::from_bytes(&blob, public.params())?;
            let evaluator = HomomorphicEvaluator::new(&public);
            let weighted = evaluator.evaluate(&ct, EvalOp::ScaleBy(scale))?;
            fs::write(&output, weighted.to_bytes(public.params()))?;
            println!("✓ Weighted ciphertext written to {}", output.display());
            Ok(())
        }

        Commands::Decrypt {
            ciphertext,
            secret_dir,
        } => {
            let secret = SecretContext::load(&FsContextStore::new(secret_dir))?;
            let blob = fs::read(&ciphertext)?;
            let ct = Ciphertext::from_bytes(&blob, secret.params())?;
            let decryptor = IntentDecryptor::new(&secret);
            let amount = decryptor.decrypt_amount(&ct)?;
            println!("{amount}");
            Ok(())
        }
    }
}

/// Load a raw intent mapping from a JSON object file or, for `.csv`, the
/// last non-zero row of a columnar portfolio table.
fn read_raw_intent(path: &Path) -> Result<BTreeMap<String, i128>, CliError> {
    let text = fs::read_to_string(path)?;
    let raw = if path.extension().is_some_and(|ext| ext == "csv") {
        order_intent_from_table(&text)?
    } else {
        order_intent_from_json(&text)?
    };
    Ok(raw)
}

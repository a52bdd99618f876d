//! Command-line interface for the Orion curator SDK.
//!
//! Structure mirrors the library's role split:
//! - [`commands`]: command definitions using `clap` (argument parsing)
//! - `handlers`: business logic for each command (SDK operations)
//! - [`output`]: file I/O and event-printing utilities
//!
//! # Available Commands
//!
//! - `deploy-vault`: Deploy a transparent or encrypted Orion vault
//! - `submit-order plain`: Validate and submit a cleartext order intent
//! - `submit-order encrypted`: Validate, encrypt and submit an order intent
//! - `keygen`: Generate an encryption context and persist its two halves
//! - `evaluate`: Apply a scalar weighting to a ciphertext (compute-server
//!   role, public context only)
//! - `decrypt`: Decrypt a ciphertext (decryptor role, secret context only)
//!
//! Chain endpoints and credentials come from the environment: `RPC_URL`,
//! `CONFIG_ADDRESS`, `FACTORY_ADDRESS`, `ORION_VAULT_ADDRESS`,
//! `CURATOR_PRIVATE_KEY`, `DEPLOYER_PRIVATE_KEY`.

pub mod commands;
mod handlers;
pub mod output;

use clap::Parser;
use commands::Cli;

/// Run the CLI application: parse arguments and dispatch to the handler.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    handlers::execute(cli.command)
}

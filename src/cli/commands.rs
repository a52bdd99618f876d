//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orion")]
#[command(about = "Orion curator SDK CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum VaultTypeArg {
    Transparent,
    Encrypted,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FeeTypeArg {
    Flat,
    HighWaterMark,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy an Orion vault through the factory
    DeployVault {
        /// Type of the vault
        #[arg(long, value_enum)]
        vault_type: VaultTypeArg,

        /// Name of the vault share token
        #[arg(long)]
        name: String,

        /// Symbol of the vault share token
        #[arg(long)]
        symbol: String,

        /// Fee schedule flavor
        #[arg(long, value_enum, default_value = "flat")]
        fee_type: FeeTypeArg,

        /// Performance fee in basis points
        #[arg(long, default_value = "0")]
        performance_fee: u16,

        /// Management fee in basis points
        #[arg(long, default_value = "0")]
        management_fee: u16,
    },

    /// Submit a portfolio order intent
    #[command(subcommand)]
    SubmitOrder(SubmitOrder),

    /// Generate a fresh encryption context and persist its two halves
    Keygen {
        /// Directory for the distributable public half
        #[arg(long, default_value = "orion-public")]
        public_dir: PathBuf,

        /// Directory for the decryptor-only secret half
        #[arg(long, default_value = "orion-secret")]
        secret_dir: PathBuf,
    },

    /// Apply a scalar weighting to a serialized ciphertext (compute-server
    /// role; needs only the public context)
    Evaluate {
        /// Input ciphertext file
        #[arg(long)]
        ciphertext: PathBuf,

        /// Directory holding the public context
        #[arg(long, default_value = "orion-public")]
        public_dir: PathBuf,

        /// Integer scalar to weight the encrypted amount by
        #[arg(long)]
        scale: u64,

        /// Output ciphertext file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Decrypt a serialized ciphertext (decryptor role; needs the secret
    /// context)
    Decrypt {
        /// Input ciphertext file
        #[arg(long)]
        ciphertext: PathBuf,

        /// Directory holding the secret context
        #[arg(long, default_value = "orion-secret")]
        secret_dir: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum SubmitOrder {
    /// Submit a plain order intent to the transparent vault
    Plain {
        /// Path to a JSON file mapping asset address to integer amount
        #[arg(long)]
        order_intent_path: PathBuf,
    },

    /// Encrypt and submit an order intent to the encrypted vault
    Encrypted {
        /// Path to the intent: a JSON object, or a columnar portfolio
        /// table (.csv)
        #[arg(long)]
        order_intent_path: PathBuf,

        /// Perturb amounts by a small bounded delta
        #[arg(long)]
        fuzz: bool,

        /// Seed for reproducible fuzz runs
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Directory holding the public context
        #[arg(long, default_value = "orion-public")]
        public_dir: PathBuf,
    },
}

//! Output formatting and file I/O utilities for the CLI.

use orion_sdk::{TransactionError, TransactionResult};

/// Pretty-print a confirmed transaction: hash, decoded events and, when a
/// vault creation is among them, the extracted vault address.
pub fn print_transaction_result(result: &TransactionResult) {
    println!("✓ Transaction hash: {}", result.tx_hash);
    if result.decoded_logs.is_empty() {
        println!("  No events decoded from transaction logs");
        return;
    }
    println!("  Transaction events:");
    for (i, log) in result.decoded_logs.iter().enumerate() {
        println!("  {}. {}", i + 1, log.event);
        for (name, value) in &log.args {
            println!("     {name}: {value}");
        }
        println!("     contract: {}", log.address.to_checksum(None));
        if let Some(block) = log.block_number {
            println!("     block: {block}");
        }
    }
}

/// Report a failed submission. The transaction identifier, when one was
/// obtained, is always printed so chain state can be inspected manually.
pub fn print_transaction_error(err: &TransactionError) {
    if let Some(tx_hash) = err.tx_hash() {
        println!("✗ Transaction hash: {tx_hash}");
    }
    match err {
        TransactionError::ConfirmationTimeout { .. } => {
            println!(
                "  Outcome unknown: query the receipt before resubmitting; \
                 the original transaction may still confirm"
            );
        }
        TransactionError::Reverted { .. } => {
            println!("  Transaction was mined but had no effect");
        }
        _ => {}
    }
}

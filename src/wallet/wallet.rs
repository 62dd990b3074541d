use ethers::core::k256::ecdsa::SigningKey;
use ethers::prelude::*;
use ethers::signers::Wallet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid private key #{index}: {reason}")]
    InvalidKey { index: usize, reason: String },
    #[error("Duplicate signer {0:?}")]
    Duplicate(Address),
}

/// Parse hex private keys into signing wallets, preserving order.
///
/// Keys may carry a `0x` prefix. The first key becomes signer 0 (the
/// deployer), the second signer 1, and so on.
pub fn load_wallets<S: AsRef<str>>(keys: &[S]) -> Result<Vec<LocalWallet>, WalletError> {
    let mut wallets: Vec<LocalWallet> = Vec::with_capacity(keys.len());

    for (index, key) in keys.iter().enumerate() {
        let wallet = parse_key(key.as_ref()).map_err(|reason| WalletError::InvalidKey {
            index,
            reason,
        })?;
        if wallets.iter().any(|w| w.address() == wallet.address()) {
            return Err(WalletError::Duplicate(wallet.address()));
        }
        wallets.push(wallet);
    }

    Ok(wallets)
}

fn parse_key(key: &str) -> Result<LocalWallet, String> {
    let hex = key.trim().trim_start_matches("0x");
    let bytes = ethers::utils::hex::decode(hex).map_err(|e| e.to_string())?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    let signing_key = SigningKey::from_slice(&bytes).map_err(|e| e.to_string())?;
    let wallet: Wallet<SigningKey> = signing_key.into();
    Ok(wallet)
}

/// Format a wei amount as ether, trimmed to at most 6 decimals.
pub fn format_balance(balance: U256) -> String {
    let ether = ethers::utils::format_ether(balance);
    match ether.split_once('.') {
        Some((integer, decimals)) => {
            let decimals = &decimals[..decimals.len().min(6)];
            let decimals = decimals.trim_end_matches('0');
            if decimals.is_empty() {
                format!("{}.0", integer)
            } else {
                format!("{}.{}", integer, decimals)
            }
        }
        None => format!("{}.0", ether),
    }
}

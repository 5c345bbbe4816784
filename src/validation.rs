use crate::models::WalletTransaction;
use bech32::hrp;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Bitcoin address format: {0}")]
    InvalidBitcoinAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Version bytes of mainnet pay-to-pubkey-hash and pay-to-script-hash addresses.
const P2PKH_VERSION: u8 = 0x00;
const P2SH_VERSION: u8 = 0x05;

pub fn validate_bitcoin_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    if address.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("bc1")) {
        return match bech32::segwit::decode(address) {
            Ok((decoded_hrp, _, _)) if decoded_hrp == hrp::BC => Ok(()),
            _ => Err(ValidationError::InvalidBitcoinAddress(address.to_string())),
        };
    }

    // Legacy addresses: version byte + 20-byte hash, then a 4-byte checksum
    // that `with_check` verifies and strips
    let decoded = match bs58::decode(address).with_check(None).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidBitcoinAddress(address.to_string())),
    };

    if decoded.len() != 21 || !matches!(decoded[0], P2PKH_VERSION | P2SH_VERSION) {
        return Err(ValidationError::InvalidBitcoinAddress(address.to_string()));
    }

    Ok(())
}

pub fn validate_wallet_transactions(txns: &[WalletTransaction]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(txns.len());
    for txn in txns {
        if txn.id.trim().is_empty() {
            return Err(ValidationError::MissingParameter("id".to_string()));
        }
        if !seen.insert(txn.id.as_str()) {
            return Err(ValidationError::InvalidParameter(format!(
                "duplicate transaction id {}",
                txn.id
            )));
        }
        if txn.wallet_id.trim().is_empty() {
            return Err(ValidationError::MissingParameter(format!("wallet for transaction {}", txn.id)));
        }
        if !txn.amount.is_finite() {
            return Err(ValidationError::InvalidParameter(format!(
                "amount for transaction {} must be a finite number",
                txn.id
            )));
        }
    }

    Ok(())
}

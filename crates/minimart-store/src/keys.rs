//! Key encoding utilities for `RocksDB`.
//!
//! Account ids are decimal strings of variable length, so compound index keys
//! separate the account part from the 16-byte ULID part with a `/` byte,
//! which cannot appear in a decimal id.

use minimart_core::{AccountId, NotificationId, PurchaseId, TransactionId};

/// Separator between the account id and the ULID in compound index keys.
const SEP: u8 = b'/';

/// Create an account key from an account id.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.key_bytes()
}

/// Create a referral code index key.
#[must_use]
pub fn referral_code_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a transaction key from a transaction id.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create an account-transaction index key.
///
/// Format: `account_id || '/' || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, transactions for an account sort by time.
#[must_use]
pub fn account_transaction_key(account_id: &AccountId, transaction_id: &TransactionId) -> Vec<u8> {
    compound_key(account_id, &transaction_id.to_bytes())
}

/// Create a prefix for iterating all transactions for an account.
#[must_use]
pub fn account_transactions_prefix(account_id: &AccountId) -> Vec<u8> {
    let mut prefix = account_id.key_bytes();
    prefix.push(SEP);
    prefix
}

/// Extract the transaction ID from an account-transaction index key.
///
/// # Panics
///
/// Panics if the key does not end in 16 ULID bytes.
#[must_use]
pub fn extract_transaction_id(key: &[u8]) -> TransactionId {
    TransactionId::from_bytes(trailing_ulid(key)).expect("valid ULID bytes")
}

/// Create a plan purchase key from a purchase id.
#[must_use]
pub fn purchase_key(purchase_id: &PurchaseId) -> Vec<u8> {
    purchase_id.to_bytes().to_vec()
}

/// Create an account-purchase index key (same layout as transactions).
#[must_use]
pub fn account_purchase_key(account_id: &AccountId, purchase_id: &PurchaseId) -> Vec<u8> {
    compound_key(account_id, &purchase_id.to_bytes())
}

/// Create a prefix for iterating all plan purchases for an account.
#[must_use]
pub fn account_purchases_prefix(account_id: &AccountId) -> Vec<u8> {
    account_transactions_prefix(account_id)
}

/// Extract the purchase ID from an account-purchase index key.
///
/// # Panics
///
/// Panics if the key does not end in 16 ULID bytes.
#[must_use]
pub fn extract_purchase_id(key: &[u8]) -> PurchaseId {
    PurchaseId::from_bytes(trailing_ulid(key)).expect("valid ULID bytes")
}

/// Create a notification key from a notification id.
#[must_use]
pub fn notification_key(notification_id: &NotificationId) -> Vec<u8> {
    notification_id.to_bytes().to_vec()
}

/// Create a redeem code key from a normalized code.
#[must_use]
pub fn redeem_code_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

fn compound_key(account_id: &AccountId, ulid_bytes: &[u8; 16]) -> Vec<u8> {
    let mut key = account_id.key_bytes();
    key.reserve(17);
    key.push(SEP);
    key.extend_from_slice(ulid_bytes);
    key
}

fn trailing_ulid(key: &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[key.len() - 16..]);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        AccountId::from_telegram(123_456).unwrap()
    }

    #[test]
    fn account_key_is_decimal_bytes() {
        assert_eq!(account_key(&account()), b"123456");
    }

    #[test]
    fn compound_key_layout() {
        let tx_id = TransactionId::generate();
        let key = account_transaction_key(&account(), &tx_id);

        assert_eq!(&key[..6], b"123456");
        assert_eq!(key[6], b'/');
        assert_eq!(&key[7..], tx_id.to_bytes());
    }

    #[test]
    fn prefix_matches_compound_keys() {
        let tx_id = TransactionId::generate();
        let key = account_transaction_key(&account(), &tx_id);
        let prefix = account_transactions_prefix(&account());

        assert!(key.starts_with(&prefix));

        // A longer decimal id must not collide with this prefix.
        let other = AccountId::from_telegram(1_234_567).unwrap();
        let other_key = account_transaction_key(&other, &tx_id);
        assert!(!other_key.starts_with(&prefix));
    }

    #[test]
    fn extract_transaction_id_roundtrip() {
        let tx_id = TransactionId::generate();
        let key = account_transaction_key(&account(), &tx_id);

        assert_eq!(extract_transaction_id(&key), tx_id);
    }

    #[test]
    fn extract_purchase_id_roundtrip() {
        let purchase_id = PurchaseId::generate();
        let key = account_purchase_key(&account(), &purchase_id);

        assert_eq!(extract_purchase_id(&key), purchase_id);
    }
}

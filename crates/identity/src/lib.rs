//! Identity primitives: content hashing, recoverable signatures, addresses.
//!
//! Every entity in the ledger is content-addressed by the keccak-256 of its
//! canonical JSON serialization and signed with an Ethereum-style secp256k1
//! key. This crate is the single place that defines both.

use alloy::primitives::{keccak256, Address, B256, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde_json::Value;

pub mod error;

pub use error::{IdentityError, Result};

/// Serialize a JSON value into its canonical form: object keys sorted
/// lexicographically at every level, no insignificant whitespace.
///
/// Two structurally equal values always produce the same byte string, so the
/// hash of an entity does not depend on the key order it arrived with.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Keccak-256 over the canonical serialization, as a 0x-prefixed hex string.
pub fn calculate_hash(value: &Value) -> String {
    let digest = keccak256(canonical_json(value).as_bytes());
    format!("0x{}", hex::encode(digest))
}

/// Check a claimed hash against the actual hash of a value.
///
/// Comparison is case-insensitive on the hex digits.
pub fn check_hash_matches(hash: &str, value: &Value) -> bool {
    hash.eq_ignore_ascii_case(&calculate_hash(value))
}

/// Sign the canonical serialization of a value with a 0x-prefixed private key.
///
/// Returns the 65-byte r||s||v signature as a 0x-prefixed hex string.
pub fn sign(secret: &str, value: &Value) -> Result<String> {
    let signer = signer_from_secret(secret)?;
    let digest = keccak256(canonical_json(value).as_bytes());
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| IdentityError::InvalidSecret(e.to_string()))?;
    Ok(format!("0x{}", hex::encode(signature.as_bytes())))
}

/// Verify that a signature over a value was produced by the given address.
///
/// Recovers the signer address from the signature and compares it to the
/// expected one. Fails loudly: a malformed signature and a mismatched signer
/// are distinct errors.
pub fn validate_signature(address: &str, signature: &str, value: &Value) -> Result<()> {
    let expected = parse_address(address)?;
    let signature = parse_signature(signature)?;
    let digest = keccak256(canonical_json(value).as_bytes());
    let recovered = signature
        .recover_address_from_prehash(&digest)
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
    if recovered != expected {
        return Err(IdentityError::SignatureMismatch {
            expected: format!("{expected:?}"),
            recovered: format!("{recovered:?}"),
        });
    }
    Ok(())
}

/// Derive the 0x-prefixed checksummed address for a private key.
pub fn address_from_secret(secret: &str) -> Result<String> {
    let signer = signer_from_secret(secret)?;
    Ok(format!("{:?}", signer.address()))
}

/// Compare two hex addresses, ignoring case and checksum differences.
pub fn addresses_equal(left: &str, right: &str) -> bool {
    match (parse_address(left), parse_address(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn signer_from_secret(secret: &str) -> Result<PrivateKeySigner> {
    let key_hex = secret.strip_prefix("0x").unwrap_or(secret);
    let key_bytes =
        hex::decode(key_hex).map_err(|e| IdentityError::InvalidSecret(e.to_string()))?;
    if key_bytes.len() != 32 {
        return Err(IdentityError::InvalidSecret(format!(
            "private key must be 32 bytes, got {}",
            key_bytes.len()
        )));
    }
    let key = B256::from_slice(&key_bytes);
    PrivateKeySigner::from_bytes(&key).map_err(|e| IdentityError::InvalidSecret(e.to_string()))
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .map_err(|e| IdentityError::InvalidAddress(format!("{address}: {e}")))
}

fn parse_signature(signature: &str) -> Result<Signature> {
    let sig_hex = signature.strip_prefix("0x").unwrap_or(signature);
    let sig_bytes =
        hex::decode(sig_hex).map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
    Signature::try_from(sig_bytes.as_slice())
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))
}

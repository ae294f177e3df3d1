use bip39::{Language, Mnemonic};
use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;

use crate::config::DerivationConfig;

type HmacSha512 = Hmac<Sha512>;

/// HMAC key for the SLIP-0010 ed25519 master node.
const ED25519_SEED_KEY: &[u8] = b"ed25519 seed";

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Per-attempt derivation failure. Transient from the engine's point of
/// view: the attempt is discarded and the worker keeps going.
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("invalid derivation path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("mnemonic generation failed: {0}")]
    Mnemonic(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// One freshly derived (address, mnemonic) pair.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub address: String,
    pub mnemonic: String,
}

/// Source of candidate wallets. Each worker owns its own instance, so
/// implementations carry no shared mutable state.
pub trait KeyDeriver: Send {
    fn derive_once(&mut self) -> Result<Candidate, DerivationError>;
}

/// Parse a BIP32-style path such as `m/44'/501'/0'/0'` into hardened child
/// indexes. SLIP-10 ed25519 only supports hardened derivation, so every
/// component must carry the hardened marker.
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>, DerivationError> {
    let invalid = |reason: String| DerivationError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(invalid("path must start with 'm'".to_string()));
    }

    let mut indexes = Vec::new();
    for part in parts {
        let raw = part
            .strip_suffix('\'')
            .ok_or_else(|| invalid(format!("component '{}' must be hardened for ed25519", part)))?;
        let index: u32 = raw
            .parse()
            .map_err(|_| invalid(format!("component '{}' is not a valid index", part)))?;
        if index >= HARDENED_OFFSET {
            return Err(invalid(format!("component '{}' is out of range", part)));
        }
        indexes.push(index | HARDENED_OFFSET);
    }

    if indexes.is_empty() {
        return Err(invalid("path has no components".to_string()));
    }
    Ok(indexes)
}

/// A SLIP-0010 node: private key half plus chain code.
struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<ExtendedKey, DerivationError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| DerivationError::KeyDerivation(e.to_string()))?;
    mac.update(data);
    let digest = mac.finalize().into_bytes();

    let mut node = ExtendedKey {
        key: [0u8; 32],
        chain_code: [0u8; 32],
    };
    node.key.copy_from_slice(&digest[..32]);
    node.chain_code.copy_from_slice(&digest[32..]);
    Ok(node)
}

fn master_key(seed: &[u8]) -> Result<ExtendedKey, DerivationError> {
    hmac_sha512(ED25519_SEED_KEY, seed)
}

fn child_key(parent: &ExtendedKey, index: u32) -> Result<ExtendedKey, DerivationError> {
    let mut data = Vec::with_capacity(37);
    data.push(0u8);
    data.extend_from_slice(&parent.key);
    data.extend_from_slice(&index.to_be_bytes());
    hmac_sha512(&parent.chain_code, &data)
}

/// Production deriver: random BIP39 mnemonic, empty passphrase, SLIP-10
/// ed25519 derivation on the configured path (Phantom-compatible by
/// default), base58 public key as the address.
#[derive(Debug, Clone)]
pub struct MnemonicWalletDeriver {
    path: Vec<u32>,
    word_count: usize,
}

impl MnemonicWalletDeriver {
    pub fn new(config: &DerivationConfig) -> Result<Self, DerivationError> {
        Ok(Self {
            path: parse_derivation_path(&config.derivation_path)?,
            word_count: config.word_count,
        })
    }

    /// Derive the address for an existing mnemonic. Exposed so the pipeline
    /// can be checked against fixed phrases.
    pub fn address_for(&self, mnemonic: &Mnemonic) -> Result<String, DerivationError> {
        let seed = mnemonic.to_seed("");
        let mut node = master_key(&seed)?;
        for &index in &self.path {
            node = child_key(&node, index)?;
        }

        let signing_key = SigningKey::from_bytes(&node.key);
        let pubkey = signing_key.verifying_key().to_bytes();
        Ok(bs58::encode(pubkey).into_string())
    }
}

impl KeyDeriver for MnemonicWalletDeriver {
    fn derive_once(&mut self) -> Result<Candidate, DerivationError> {
        let mnemonic = Mnemonic::generate_in(Language::English, self.word_count)
            .map_err(|e| DerivationError::Mnemonic(e.to_string()))?;
        let address = self.address_for(&mnemonic)?;
        Ok(Candidate {
            address,
            mnemonic: mnemonic.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn test_deriver(path: &str) -> MnemonicWalletDeriver {
        MnemonicWalletDeriver::new(&DerivationConfig {
            derivation_path: path.to_string(),
            word_count: 24,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_phantom_path() {
        let indexes = parse_derivation_path("m/44'/501'/0'/0'").unwrap();
        assert_eq!(
            indexes,
            vec![
                44 | HARDENED_OFFSET,
                501 | HARDENED_OFFSET,
                HARDENED_OFFSET,
                HARDENED_OFFSET,
            ]
        );
    }

    #[test]
    fn test_parse_rejects_non_hardened_component() {
        let err = parse_derivation_path("m/44'/501'/0/0").unwrap_err().to_string();
        assert!(err.contains("hardened"), "got err: {}", err);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_derivation_path("44'/501'").is_err());
        assert!(parse_derivation_path("m").is_err());
        assert!(parse_derivation_path("m/abc'").is_err());
    }

    // SLIP-0010 ed25519 test vector 1, seed 000102030405060708090a0b0c0d0e0f
    #[test]
    fn test_slip10_master_node_vector() {
        let seed: Vec<u8> = (0u8..16).collect();
        let node = master_key(&seed).unwrap();
        assert_eq!(
            to_hex(&node.key),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            to_hex(&node.chain_code),
            "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb"
        );
    }

    #[test]
    fn test_slip10_hardened_child_vector() {
        let seed: Vec<u8> = (0u8..16).collect();
        let master = master_key(&seed).unwrap();
        let child = child_key(&master, HARDENED_OFFSET).unwrap();
        assert_eq!(
            to_hex(&child.key),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
        assert_eq!(
            to_hex(&child.chain_code),
            "8b59aa11380b624e81507a27fedda59fea6d0b779a778918a2fd3590e16e9c69"
        );
    }

    #[test]
    fn test_address_is_deterministic_for_fixed_mnemonic() {
        let phrase = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon about";
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase).unwrap();

        let deriver = test_deriver("m/44'/501'/0'/0'");
        let first = deriver.address_for(&mnemonic).unwrap();
        let second = deriver.address_for(&mnemonic).unwrap();
        assert_eq!(first, second);

        // A Solana address is the base58 encoding of 32 bytes
        let decoded = bs58::decode(&first).into_vec().unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_different_paths_give_different_addresses() {
        let phrase = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon about";
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase).unwrap();

        let phantom = test_deriver("m/44'/501'/0'/0'").address_for(&mnemonic).unwrap();
        let other = test_deriver("m/44'/501'/1'/0'").address_for(&mnemonic).unwrap();
        assert_ne!(phantom, other);
    }

    #[test]
    fn test_derive_once_yields_fresh_candidates() {
        let mut deriver = test_deriver("m/44'/501'/0'/0'");
        let a = deriver.derive_once().unwrap();
        let b = deriver.derive_once().unwrap();

        // 24-word mnemonics, randomly generated, must differ
        assert_eq!(a.mnemonic.split_whitespace().count(), 24);
        assert_ne!(a.mnemonic, b.mnemonic);
        assert_ne!(a.address, b.address);
    }
}

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base58 alphabet used by Solana addresses (no 0, O, I, l).
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Longest possible base58 encoding of a 32-byte public key.
const MAX_ADDRESS_LEN: usize = 44;

/// Address filter, configured once at startup and shared read-only by all
/// workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum VanityPattern {
    /// Literal prefix, compared case-insensitively
    Prefix { value: String },

    /// First N characters are all lowercase letters
    Lowercase { length: usize },

    /// First N characters are all uppercase letters
    Uppercase { length: usize },
}

impl VanityPattern {
    /// Test an address against the configured pattern. Pure; an address
    /// shorter than the required prefix never matches.
    pub fn matches(&self, address: &str) -> bool {
        let addr = address.as_bytes();
        match self {
            VanityPattern::Prefix { value } => {
                let prefix = value.as_bytes();
                addr.len() >= prefix.len() && addr[..prefix.len()].eq_ignore_ascii_case(prefix)
            }
            VanityPattern::Lowercase { length } => {
                addr.len() >= *length && addr[..*length].iter().all(|b| b.is_ascii_lowercase())
            }
            VanityPattern::Uppercase { length } => {
                addr.len() >= *length && addr[..*length].iter().all(|b| b.is_ascii_uppercase())
            }
        }
    }

    /// Reject patterns that can never match a base58 address.
    pub fn validate(&self) -> Result<()> {
        match self {
            VanityPattern::Prefix { value } => {
                if value.is_empty() {
                    bail!("pattern.value must not be empty");
                }
                if value.len() > MAX_ADDRESS_LEN {
                    bail!(
                        "pattern.value is longer than a Solana address ({} chars max)",
                        MAX_ADDRESS_LEN
                    );
                }
                for c in value.chars() {
                    // Case-insensitive match: a char is fine if either case
                    // of it can appear in base58.
                    let lower = c.to_ascii_lowercase();
                    let upper = c.to_ascii_uppercase();
                    if !BASE58_ALPHABET.contains(lower) && !BASE58_ALPHABET.contains(upper) {
                        bail!(
                            "pattern.value contains '{}', which never appears in a base58 address",
                            c
                        );
                    }
                }
                Ok(())
            }
            VanityPattern::Lowercase { length } | VanityPattern::Uppercase { length } => {
                if *length == 0 {
                    bail!("pattern.length must be greater than 0");
                }
                if *length > MAX_ADDRESS_LEN {
                    bail!(
                        "pattern.length is longer than a Solana address ({} chars max)",
                        MAX_ADDRESS_LEN
                    );
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for VanityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VanityPattern::Prefix { value } => {
                write!(f, "prefix \"{}\" (case-insensitive)", value)
            }
            VanityPattern::Lowercase { length } => write!(f, "{} leading lowercase letters", length),
            VanityPattern::Uppercase { length } => write!(f, "{} leading uppercase letters", length),
        }
    }
}

//! Address checksums.
//!
//! A checksum is a 5-letter string derived from an entity id's textual form
//! (`shard.realm.num`) and the ledger id of the network it belongs to. Pasting
//! an id from one network into a client configured for another fails the
//! comparison instead of silently targeting the wrong entity.

use commonware_utils::{from_hex_formatted, hex};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of letters in a checksum produced by [checksum].
pub const CHECKSUM_LENGTH: usize = 5;

/// Maximum number of letters accepted when parsing a user-supplied checksum.
///
/// Longer than [CHECKSUM_LENGTH] so that a malformed suffix is reported as a
/// mismatch (naming the expected value) rather than as a parse failure.
pub const MAX_CHECKSUM_LENGTH: usize = 8;

const P3: u64 = 26 * 26 * 26;
const P5: u64 = 26 * 26 * 26 * 26 * 26;
const M: u64 = 1_000_003;
const W: u64 = 31;

/// Identifies the ledger a client is configured for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LedgerId {
    Mainnet,
    Testnet,
    Previewnet,
    Other(Vec<u8>),
}

impl LedgerId {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Mainnet => &[0],
            Self::Testnet => &[1],
            Self::Previewnet => &[2],
            Self::Other(bytes) => bytes,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [0] => Self::Mainnet,
            [1] => Self::Testnet,
            [2] => Self::Previewnet,
            other => Self::Other(other.to_vec()),
        }
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => f.write_str("mainnet"),
            Self::Testnet => f.write_str("testnet"),
            Self::Previewnet => f.write_str("previewnet"),
            Self::Other(bytes) => write!(f, "0x{}", hex(bytes)),
        }
    }
}

/// Error returned when a ledger id string is neither a known name nor hex.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid ledger id: {0}")]
pub struct InvalidLedgerId(pub String);

impl FromStr for LedgerId {
    type Err = InvalidLedgerId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "previewnet" => Ok(Self::Previewnet),
            other => match from_hex_formatted(other) {
                Some(bytes) if !bytes.is_empty() => Ok(Self::from_bytes(&bytes)),
                _ => Err(InvalidLedgerId(other.to_string())),
            },
        }
    }
}

/// Checksum validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error(
        "checksum mismatch for {address}: given `{given}`, expected `{expected}` on network {network}"
    )]
    Mismatch {
        address: String,
        given: String,
        expected: String,
        network: String,
    },
}

/// Compute the checksum of `address` (`shard.realm.num`) on `ledger`.
pub fn checksum(ledger: &LedgerId, address: &str) -> String {
    let digits: Vec<u64> = address
        .bytes()
        .map(|b| if b == b'.' { 10 } else { u64::from(b.wrapping_sub(b'0')) })
        .collect();

    let mut sd0 = 0;
    let mut sd1 = 0;
    let mut sd = 0;
    for (i, digit) in digits.iter().enumerate() {
        sd = (W * sd + digit) % P3;
        if i % 2 == 0 {
            sd0 = (sd0 + digit) % 11;
        } else {
            sd1 = (sd1 + digit) % 11;
        }
    }

    // The ledger id is padded with six zero bytes.
    let mut sh = 0;
    for byte in ledger.as_bytes().iter().copied().chain([0u8; 6]) {
        sh = (W * sh + u64::from(byte)) % P5;
    }

    let c = ((((digits.len() as u64 % 5) * 11 + sd0) * 11 + sd1) * P3 + sd + sh) % P5;
    let mut cp = (c * M) % P5;

    let mut letters = [0u8; CHECKSUM_LENGTH];
    for letter in letters.iter_mut().rev() {
        *letter = b'a' + (cp % 26) as u8;
        cp /= 26;
    }
    letters.iter().map(|&b| b as char).collect()
}

/// Validate a user-supplied checksum for `address` against `ledger`.
///
/// An absent checksum is always valid.
pub fn validate(ledger: &LedgerId, address: &str, given: Option<&str>) -> Result<(), ChecksumError> {
    let Some(given) = given else {
        return Ok(());
    };
    let expected = checksum(ledger, address);
    if given != expected {
        return Err(ChecksumError::Mismatch {
            address: address.to_string(),
            given: given.to_string(),
            expected,
            network: ledger.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_checksums() {
        assert_eq!(checksum(&LedgerId::Mainnet, "0.0.123"), "vfmkw");
        assert_eq!(checksum(&LedgerId::Testnet, "0.0.123"), "esxsf");
        assert_eq!(checksum(&LedgerId::Previewnet, "0.0.123"), "ogizo");
    }

    #[test]
    fn checksum_depends_on_ledger() {
        let custom = LedgerId::Other(vec![0xde, 0xad]);
        assert_ne!(
            checksum(&custom, "0.0.123"),
            checksum(&LedgerId::Mainnet, "0.0.123")
        );
        assert_eq!(checksum(&custom, "0.0.123").len(), CHECKSUM_LENGTH);
    }

    #[test]
    fn mismatch_names_both_checksums_and_network() {
        let err = validate(&LedgerId::Testnet, "0.0.123", Some("rmkykd")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("rmkykd"), "{message}");
        assert!(message.contains("esxsf"), "{message}");
        assert!(message.contains("testnet"), "{message}");
    }

    #[test]
    fn absent_checksum_is_valid() {
        assert!(validate(&LedgerId::Mainnet, "0.0.123", None).is_ok());
        assert!(validate(&LedgerId::Mainnet, "0.0.123", Some("vfmkw")).is_ok());
    }

    #[test]
    fn ledger_id_parses_names_and_hex() {
        assert_eq!("testnet".parse::<LedgerId>().unwrap(), LedgerId::Testnet);
        assert_eq!("0x02".parse::<LedgerId>().unwrap(), LedgerId::Previewnet);
        assert_eq!(
            "0x0a0b".parse::<LedgerId>().unwrap(),
            LedgerId::Other(vec![0x0a, 0x0b])
        );
        assert!("moonnet".parse::<LedgerId>().is_err());
        assert_eq!(LedgerId::Other(vec![0x0a]).to_string(), "0x0a");
    }
}

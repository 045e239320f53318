//! Entity identifiers (`shard.realm.num`) with optional address checksums.

use crate::checksum::{self, ChecksumError, LedgerId, MAX_CHECKSUM_LENGTH};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};
use thiserror::Error;

/// Failure to parse a textual entity id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} id `{value}`: {reason}")]
pub struct IdError {
    pub kind: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// A checksum suffix as written by the user (lowercase ASCII letters).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    letters: [u8; MAX_CHECKSUM_LENGTH],
    len: u8,
}

impl Checksum {
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty()
            || value.len() > MAX_CHECKSUM_LENGTH
            || !value.bytes().all(|b| b.is_ascii_lowercase())
        {
            return None;
        }
        let mut letters = [0u8; MAX_CHECKSUM_LENGTH];
        letters[..value.len()].copy_from_slice(value.as_bytes());
        Some(Self {
            letters,
            len: value.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.letters[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The numeric part shared by every entity id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Parse `shard.realm.num` with an optional `-checksum` suffix.
    fn parse(kind: &'static str, value: &str) -> Result<(Self, Option<Checksum>), IdError> {
        let err = |reason| IdError {
            kind,
            value: value.to_string(),
            reason,
        };
        let (address, checksum) = match value.split_once('-') {
            Some((address, checksum)) => (
                address,
                Some(Checksum::parse(checksum).ok_or_else(|| err("malformed checksum"))?),
            ),
            None => (value, None),
        };
        let mut parts = address.split('.');
        let mut next = || -> Result<u64, IdError> {
            let part = parts.next().ok_or_else(|| err("expected shard.realm.num"))?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err("components must be decimal digits"));
            }
            part.parse().map_err(|_| err("component out of range"))
        };
        let id = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err("expected shard.realm.num"));
        }
        Ok((id, checksum))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl Write for EntityId {
    fn write(&self, writer: &mut impl BufMut) {
        self.shard.write(writer);
        self.realm.write(writer);
        self.num.write(writer);
    }
}

impl Read for EntityId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            shard: u64::read(reader)?,
            realm: u64::read(reader)?,
            num: u64::read(reader)?,
        })
    }
}

impl EncodeSize for EntityId {
    fn encode_size(&self) -> usize {
        self.shard.encode_size() + self.realm.encode_size() + self.num.encode_size()
    }
}

/// Declares a typed entity id.
///
/// Equality, ordering and hashing only consider the numeric part; the
/// checksum is carried for validation and never encoded on the wire.
macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name {
            pub shard: u64,
            pub realm: u64,
            pub num: u64,
            pub checksum: Option<Checksum>,
        }

        impl $name {
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self {
                    shard,
                    realm,
                    num,
                    checksum: None,
                }
            }

            pub const fn entity(&self) -> EntityId {
                EntityId::new(self.shard, self.realm, self.num)
            }

            /// Render the id with the checksum computed for `ledger`.
            pub fn to_string_with_checksum(&self, ledger: &LedgerId) -> String {
                let address = self.entity().to_string();
                let checksum = checksum::checksum(ledger, &address);
                format!("{address}-{checksum}")
            }

            /// Check the parsed checksum (if any) against `ledger`.
            pub fn validate_checksum(&self, ledger: &LedgerId) -> Result<(), ChecksumError> {
                checksum::validate(
                    ledger,
                    &self.entity().to_string(),
                    self.checksum.as_ref().map(Checksum::as_str),
                )
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self::new(id.shard, id.realm, id.num)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.entity() == other.entity()
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.entity().hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.entity().cmp(&other.entity())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.entity(), f)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (id, checksum) = EntityId::parse($kind, s)?;
                Ok(Self {
                    checksum,
                    ..Self::from(id)
                })
            }
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                self.entity().write(writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                EntityId::read(reader).map(Self::from)
            }
        }

        impl EncodeSize for $name {
            fn encode_size(&self) -> usize {
                self.entity().encode_size()
            }
        }
    };
}

entity_id!(
    /// An account (also used for node accounts and payers).
    AccountId,
    "account"
);
entity_id!(FileId, "file");
entity_id!(TopicId, "topic");
entity_id!(ScheduleId, "schedule");

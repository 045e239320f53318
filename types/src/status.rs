use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use std::fmt;

/// Declares [Status] together with its numeric codes and textual names.
macro_rules! statuses {
    ($($(#[$doc:meta])* $variant:ident = $code:literal => $name:literal,)*) => {
        /// Status codes returned by nodes at precheck and inside receipts.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Status {
            $($(#[$doc])* $variant,)*
            /// A code this client does not know about.
            Unrecognized(u32),
        }

        impl Status {
            pub const fn code(&self) -> u32 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unrecognized(code) => *code,
                }
            }

            pub const fn from_code(code: u32) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    other => Self::Unrecognized(other),
                }
            }

            /// The textual name reported to callers (e.g. `BUSY`).
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Unrecognized(_) => "UNRECOGNIZED",
                }
            }
        }
    };
}

statuses! {
    /// The transaction passed precheck.
    Ok = 0 => "OK",
    InvalidTransaction = 1 => "INVALID_TRANSACTION",
    PayerAccountNotFound = 2 => "PAYER_ACCOUNT_NOT_FOUND",
    /// The body names a different node than the one it was sent to.
    InvalidNodeAccount = 3 => "INVALID_NODE_ACCOUNT",
    TransactionExpired = 4 => "TRANSACTION_EXPIRED",
    InvalidTransactionStart = 5 => "INVALID_TRANSACTION_START",
    InvalidTransactionDuration = 6 => "INVALID_TRANSACTION_DURATION",
    InvalidSignature = 7 => "INVALID_SIGNATURE",
    MemoTooLong = 8 => "MEMO_TOO_LONG",
    InsufficientTxFee = 9 => "INSUFFICIENT_TX_FEE",
    InsufficientPayerBalance = 10 => "INSUFFICIENT_PAYER_BALANCE",
    DuplicateTransaction = 11 => "DUPLICATE_TRANSACTION",
    /// The node is temporarily unable to accept work.
    Busy = 12 => "BUSY",
    NotSupported = 13 => "NOT_SUPPORTED",
    InvalidFileId = 14 => "INVALID_FILE_ID",
    InvalidAccountId = 15 => "INVALID_ACCOUNT_ID",
    InvalidTransactionId = 17 => "INVALID_TRANSACTION_ID",
    ReceiptNotFound = 18 => "RECEIPT_NOT_FOUND",
    /// The outcome of the transaction is not yet known.
    Unknown = 21 => "UNKNOWN",
    /// The transaction reached consensus and was applied.
    Success = 22 => "SUCCESS",
    InvalidSignatureCount = 26 => "KEY_REQUIRED",
    TransactionOversize = 43 => "TRANSACTION_OVERSIZE",
    /// The node accepted the transaction but could not hand it to the platform.
    PlatformTransactionNotCreated = 48 => "PLATFORM_TRANSACTION_NOT_CREATED",
    InvalidTopicId = 150 => "INVALID_TOPIC_ID",
    InvalidChunkNumber = 164 => "INVALID_CHUNK_NUMBER",
    InvalidChunkTransactionId = 165 => "INVALID_CHUNK_TRANSACTION_ID",
    /// The node is not yet (or no longer) participating in consensus.
    PlatformNotActive = 175 => "PLATFORM_NOT_ACTIVE",
    InvalidScheduleId = 201 => "INVALID_SCHEDULE_ID",
    ScheduleAlreadyExecuted = 212 => "SCHEDULE_ALREADY_EXECUTED",
    /// The transaction was throttled after reaching consensus.
    ThrottledAtConsensus = 366 => "THROTTLED_AT_CONSENSUS",
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(code) => write!(f, "UNRECOGNIZED({code})"),
            other => f.write_str(other.name()),
        }
    }
}

impl Write for Status {
    fn write(&self, writer: &mut impl BufMut) {
        self.code().write(writer);
    }
}

impl Read for Status {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self::from_code(u32::read(reader)?))
    }
}

impl EncodeSize for Status {
    fn encode_size(&self) -> usize {
        self.code().encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            Status::Ok,
            Status::Busy,
            Status::PlatformNotActive,
            Status::TransactionExpired,
            Status::ThrottledAtConsensus,
            Status::Success,
        ] {
            assert_eq!(Status::from_code(status.code()), status);
        }
        assert_eq!(Status::from_code(9_999), Status::Unrecognized(9_999));
    }

    #[test]
    fn names_are_textual() {
        assert_eq!(Status::Busy.to_string(), "BUSY");
        assert_eq!(Status::ThrottledAtConsensus.to_string(), "THROTTLED_AT_CONSENSUS");
        assert_eq!(Status::Unrecognized(7_000).to_string(), "UNRECOGNIZED(7000)");
    }
}

use crate::{
    payload::{wrong_kind, ChunkContext, Payload},
    transaction::Transaction,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{ChecksumError, FileId, LedgerId, TransactionData, TransactionKind};

pub type FileAppendTransaction = Transaction<FileAppend>;

/// Append content to a file, split into as many chunks as needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAppend {
    pub file_id: FileId,
    pub contents: Vec<u8>,
}

impl FileAppend {
    pub const DEFAULT_MAX_FEE: u64 = 500_000_000;

    pub fn new(file_id: FileId, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_id,
            contents: contents.into(),
        }
    }
}

impl Payload for FileAppend {
    const KIND: TransactionKind = TransactionKind::FileAppend;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::File, "appendContent")
    }

    fn build_data(&self, chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        TransactionData::FileAppend {
            file_id: self.file_id,
            contents: chunk.map_or(&self.contents[..], |chunk| chunk.content).to_vec(),
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.file_id.validate_checksum(ledger)
    }

    fn chunked_content(&self) -> Option<&[u8]> {
        Some(&self.contents)
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        let mut file = None;
        let mut contents = Vec::new();
        for data in chunks {
            let TransactionData::FileAppend {
                file_id,
                contents: chunk,
            } = data
            else {
                return Err(wrong_kind());
            };
            if *file.get_or_insert(file_id) != file_id {
                return Err(Error::InvalidData(commonware_codec::Error::Invalid(
                    "TransactionList",
                    "chunks append to different files",
                )));
            }
            contents.extend_from_slice(&chunk);
        }
        let file_id = file.ok_or_else(wrong_kind)?;
        Ok(Self { file_id, contents })
    }
}

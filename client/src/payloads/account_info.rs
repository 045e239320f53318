use crate::{
    query::QueryPayload,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{AccountId, AccountInfo, ChecksumError, LedgerId, QueryAnswer, QueryData};

/// Full account state. Paid: each answering node receives a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountInfoQuery {
    pub account_id: AccountId,
}

impl AccountInfoQuery {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id }
    }
}

impl QueryPayload for AccountInfoQuery {
    type Output = AccountInfo;

    fn method(&self) -> Method {
        Method::new(Service::Crypto, "getAccountInfo")
    }

    fn is_paid(&self) -> bool {
        true
    }

    fn data(&self) -> QueryData {
        QueryData::AccountInfo {
            account_id: self.account_id,
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.account_id.validate_checksum(ledger)
    }

    fn make_output(answer: QueryAnswer) -> Result<AccountInfo> {
        match answer {
            QueryAnswer::Info(info) => Ok(info),
            _ => Err(Error::UnexpectedResponse),
        }
    }
}

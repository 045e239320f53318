use crate::{
    query::QueryPayload,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{AccountBalance, AccountId, ChecksumError, LedgerId, QueryAnswer, QueryData};

/// Current balance of an account. Free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountBalanceQuery {
    pub account_id: AccountId,
}

impl AccountBalanceQuery {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id }
    }
}

impl QueryPayload for AccountBalanceQuery {
    type Output = AccountBalance;

    fn method(&self) -> Method {
        Method::new(Service::Crypto, "cryptoGetBalance")
    }

    fn is_paid(&self) -> bool {
        false
    }

    fn data(&self) -> QueryData {
        QueryData::AccountBalance {
            account_id: self.account_id,
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.account_id.validate_checksum(ledger)
    }

    fn make_output(answer: QueryAnswer) -> Result<AccountBalance> {
        match answer {
            QueryAnswer::Balance(balance) => Ok(balance),
            _ => Err(Error::UnexpectedResponse),
        }
    }
}

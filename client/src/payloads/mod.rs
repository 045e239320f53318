//! Concrete transaction and query types.

pub mod account_balance;
pub mod account_create;
pub mod account_info;
pub mod file_append;
pub mod schedule;
pub mod topic_message_submit;
pub mod transaction_receipt;
pub mod transfer;

pub use account_balance::AccountBalanceQuery;
pub use account_create::{AccountCreate, AccountCreateTransaction};
pub use account_info::AccountInfoQuery;
pub use file_append::{FileAppend, FileAppendTransaction};
pub use schedule::{ScheduleCreate, ScheduleCreateTransaction, ScheduleSign, ScheduleSignTransaction};
pub use topic_message_submit::{TopicMessageSubmit, TopicMessageSubmitTransaction};
pub use transaction_receipt::TransactionReceiptQuery;
pub use transfer::{Transfer, TransferTransaction};

//! Command line client for a meridian ledger network.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meridian_client::{
    config::Config,
    payloads::{AccountBalanceQuery, AccountInfoQuery, TopicMessageSubmit, Transfer},
    Client, Query, Transaction,
};
use meridian_types::{AccountId, TopicId};
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "meridian", author, version, about = "Submit transactions to and query a meridian ledger")]
struct Args {
    /// Path to the YAML client configuration
    #[arg(long, default_value = "meridian.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the balance of an account.
    Balance { account: AccountId },
    /// Print the full state of an account (paid query).
    Info { account: AccountId },
    /// Move value from the operator account to another account.
    Transfer { to: AccountId, amount: i64 },
    /// Publish a message to a topic.
    SubmitMessage { topic: TopicId, message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let contents = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let config = Config::from_yaml(&contents).context("failed to parse config")?;
    let config = config.validate().context("invalid config")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let client = Client::from_config(config).context("failed to build client")?;

    match args.command {
        Command::Balance { account } => {
            let balance = Query::new(AccountBalanceQuery::new(account))
                .execute(&client)
                .await
                .context("balance query failed")?;
            println!("{} {}", balance.account_id, balance.balance);
        }
        Command::Info { account } => {
            let info = Query::new(AccountInfoQuery::new(account))
                .execute(&client)
                .await
                .context("info query failed")?;
            println!("{info:#?}");
        }
        Command::Transfer { to, amount } => {
            let operator = client
                .operator()
                .context("transfer needs an operator in the config")?
                .account_id;
            let mut transaction = Transaction::new(
                Transfer::new()
                    .add_transfer(operator, amount.saturating_neg())
                    .add_transfer(to, amount),
            );
            let response = transaction
                .execute(&client)
                .await
                .context("transfer failed")?;
            info!(transaction_id = %response.transaction_id, node = %response.node_account_id, "transfer accepted");
            let receipt = response
                .get_successful_receipt(&client)
                .await
                .context("transfer did not succeed")?;
            println!("{} {}", response.transaction_id, receipt.status);
        }
        Command::SubmitMessage { topic, message } => {
            let mut transaction =
                Transaction::new(TopicMessageSubmit::new(topic, message.into_bytes()));
            let responses = transaction
                .execute_all(&client)
                .await
                .context("message submission failed")?;
            for response in &responses {
                info!(transaction_id = %response.transaction_id, node = %response.node_account_id, "chunk accepted");
                let receipt = response
                    .get_successful_receipt(&client)
                    .await
                    .context("message was not recorded")?;
                println!(
                    "{} sequence {}",
                    response.transaction_id, receipt.topic_sequence_number
                );
            }
        }
    }
    Ok(())
}

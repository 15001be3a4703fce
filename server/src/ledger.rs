//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Coin ledger
//!
//! Balances live in the `bank` table, one record per character. All reads
//! and writes go through a single ledger actor, so a transfer's two balance
//! updates are never interleaved with another transfer touching either side.
//! Both rows of a transfer are written in one store request, so a failed
//! write leaves both balances as they were.

use crate::records::{BANK, BankRecord};
use async_trait::async_trait;
use havok_currency::{Currency, CurrencyError, ExchangeTable};
use havok_mediator::{Mediator, MediatorError, MediatorResult, Resource, StoreError, StoreHandle, key};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Ledger failure
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The balance store failed
    #[error("Balance store failed: {0}")]
    Store(#[from] MediatorError<StoreError>),

    /// Coin arithmetic failed, including insufficient funds
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Payer and payee are the same account
    #[error("Cannot transfer from {0} to itself")]
    SameAccount(String),
}

impl LedgerError {
    /// Whether the payer could not cover the amount
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, LedgerError::Currency(CurrencyError::InsufficientFunds { .. }))
    }
}

/// A payment between two ledger accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Paying account
    pub from: String,
    /// Receiving account
    pub to: String,
    /// Value owed
    pub amount: Currency,
}

/// Outcome of a [`Transfer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Coins handed over by the payer
    pub paid: Currency,
    /// Coins handed back by the payee
    pub change: Currency,
    /// Payer's balance afterwards
    pub balance: Currency,
}

/// Operations understood by the [`Ledger`]
#[derive(Debug, Clone)]
pub enum LedgerRequest {
    /// Current balance
    Balance(String),
    /// Add coins to an account
    Deposit {
        /// Receiving account
        account: String,
        /// Coins added
        amount: Currency,
    },
    /// Pay with minimal overpayment and give change
    Transfer(Transfer),
}

/// Replies from the [`Ledger`]
#[derive(Debug, Clone)]
pub enum LedgerReply {
    /// Balance of the requested account
    Balance(Currency),
    /// Balance after a deposit
    Deposited(Currency),
    /// Completed transfer
    Transferred(Receipt),
}

/// Balances backed by the record store.
#[derive(Debug)]
pub struct Ledger {
    store: StoreHandle,
    table: Arc<ExchangeTable>,
}

impl Ledger {
    /// A ledger over `store`'s `bank` table
    pub fn new(store: StoreHandle, table: Arc<ExchangeTable>) -> Self {
        Self { store, table }
    }

    async fn load(&self, account: &str) -> Result<Currency, LedgerError> {
        let record: Option<BankRecord> = self.store.get(BANK, key([("account", account)])).await?;
        match record {
            Some(record) => Ok(record.currency(&self.table)?),
            None => Ok(Currency::new(self.table.clone())),
        }
    }

    async fn save(&self, account: &str, balance: &Currency) -> Result<(), LedgerError> {
        self.store
            .put(BANK, &BankRecord::from_currency(account, balance))
            .await?;
        Ok(())
    }

    async fn transfer(&self, transfer: Transfer) -> Result<Receipt, LedgerError> {
        let Transfer { from, to, amount } = transfer;
        if from.eq_ignore_ascii_case(&to) {
            return Err(LedgerError::SameAccount(from));
        }
        let mut payer = self.load(&from).await?;
        let mut payee = self.load(&to).await?;

        let paid = payer.minimal_payment(&amount)?;
        let change = Currency::minimal_change(
            self.table.clone(),
            paid.convert_to_base() - amount.convert_to_base(),
        );
        payer.subtract_value(&paid)?;
        payer.add_value(&change)?;
        payee.add_value(&paid)?;
        payee.subtract_value(&change)?;

        self.store
            .put_all(
                BANK,
                &[
                    BankRecord::from_currency(&from, &payer),
                    BankRecord::from_currency(&to, &payee),
                ],
            )
            .await?;
        counter!("havokmud.ledger.transfers").increment(1);
        info!(from = %from, to = %to, amount = %amount, paid = %paid, change = %change, "Transfer completed");
        Ok(Receipt {
            paid,
            change,
            balance: payer,
        })
    }
}

#[async_trait]
impl Resource for Ledger {
    type Request = LedgerRequest;
    type Reply = LedgerReply;
    type Error = LedgerError;

    async fn handle(&mut self, request: LedgerRequest) -> Result<LedgerReply, LedgerError> {
        match request {
            LedgerRequest::Balance(account) => Ok(LedgerReply::Balance(self.load(&account).await?)),
            LedgerRequest::Deposit { account, amount } => {
                let mut balance = self.load(&account).await?;
                balance.add_value(&amount)?;
                self.save(&account, &balance).await?;
                debug!(account = %account, amount = %amount, "Deposit");
                Ok(LedgerReply::Deposited(balance))
            }
            LedgerRequest::Transfer(transfer) => Ok(LedgerReply::Transferred(self.transfer(transfer).await?)),
        }
    }
}

/// Handle to the ledger actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    mediator: Mediator<(), Ledger>,
    table: Arc<ExchangeTable>,
}

impl LedgerHandle {
    /// Spawn a ledger actor
    pub fn spawn(store: StoreHandle, table: Arc<ExchangeTable>) -> LedgerHandle {
        LedgerHandle {
            mediator: Mediator::single("ledger", Ledger::new(store, table.clone())),
            table,
        }
    }

    /// Exchange table the ledger counts in
    pub fn table(&self) -> &Arc<ExchangeTable> {
        &self.table
    }

    /// Current balance of `account`
    pub async fn get_balance(&self, account: &str) -> MediatorResult<Currency, LedgerError> {
        match self.mediator.call(LedgerRequest::Balance(account.to_string())).await? {
            LedgerReply::Balance(balance) => Ok(balance),
            other => Err(unexpected(other)),
        }
    }

    /// Add `amount` to `account`, returning the new balance
    pub async fn deposit(&self, account: &str, amount: Currency) -> MediatorResult<Currency, LedgerError> {
        let request = LedgerRequest::Deposit {
            account: account.to_string(),
            amount,
        };
        match self.mediator.call(request).await? {
            LedgerReply::Deposited(balance) => Ok(balance),
            other => Err(unexpected(other)),
        }
    }

    /// Apply `transfer` atomically
    pub async fn submit_transfer(&self, transfer: Transfer) -> MediatorResult<Receipt, LedgerError> {
        match self.mediator.call(LedgerRequest::Transfer(transfer)).await? {
            LedgerReply::Transferred(receipt) => Ok(receipt),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: LedgerReply) -> MediatorError<LedgerError> {
    MediatorError::NoHandler(format!("unexpected ledger reply {:?}", reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use havok_mediator::Table;

    fn ledger() -> LedgerHandle {
        let store = StoreHandle::spawn([(BANK, Table::in_memory(["account"]))]);
        LedgerHandle::spawn(store, Arc::new(ExchangeTable::standard()))
    }

    fn coins(ledger: &LedgerHandle, text: &str) -> Currency {
        Currency::parse(ledger.table().clone(), text).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_account_is_empty() {
        let ledger = ledger();
        assert!(ledger.get_balance("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_accumulates() {
        let ledger = ledger();
        ledger.deposit("frodo", coins(&ledger, "2gp")).await.unwrap();
        let balance = ledger.deposit("frodo", coins(&ledger, "5cp")).await.unwrap();
        assert_eq!(balance, coins(&ledger, "2gp 5cp"));
        assert_eq!(ledger.get_balance("frodo").await.unwrap(), balance);
    }

    #[tokio::test]
    async fn test_transfer_with_change() {
        let ledger = ledger();
        ledger.deposit("frodo", coins(&ledger, "1gp 3sp")).await.unwrap();
        let receipt = ledger
            .submit_transfer(Transfer {
                from: "frodo".into(),
                to: "sam".into(),
                amount: coins(&ledger, "25cp"),
            })
            .await
            .unwrap();
        assert_eq!(receipt.paid, coins(&ledger, "3sp"));
        assert_eq!(receipt.change, coins(&ledger, "5cp"));
        assert_eq!(receipt.balance, coins(&ledger, "1gp 5cp"));

        let payee = ledger.get_balance("sam").await.unwrap();
        assert_eq!(payee.convert_to_base(), 25);
        let payer = ledger.get_balance("frodo").await.unwrap();
        assert_eq!(payer.convert_to_base(), 105);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances() {
        let ledger = ledger();
        ledger.deposit("frodo", coins(&ledger, "4cp")).await.unwrap();
        let err = ledger
            .submit_transfer(Transfer {
                from: "frodo".into(),
                to: "sam".into(),
                amount: coins(&ledger, "1sp"),
            })
            .await
            .unwrap_err();
        assert!(err.resource_error().is_some_and(LedgerError::is_insufficient_funds));
        assert_eq!(ledger.get_balance("frodo").await.unwrap(), coins(&ledger, "4cp"));
        assert!(ledger.get_balance("sam").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_transfer_rejected() {
        let ledger = ledger();
        let err = ledger
            .submit_transfer(Transfer {
                from: "frodo".into(),
                to: "Frodo".into(),
                amount: coins(&ledger, "1cp"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.resource_error(), Some(LedgerError::SameAccount(_))));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_both_balances() {
        let dir = std::env::temp_dir().join(format!("havok-ledger-{}", uuid::Uuid::new_v4()));
        let path = dir.join("bank.json");
        let store = StoreHandle::spawn([(BANK, Table::open(&path, ["account"]).await.unwrap())]);
        let ledger = LedgerHandle::spawn(store, Arc::new(ExchangeTable::standard()));
        ledger.deposit("frodo", coins(&ledger, "2gp")).await.unwrap();
        tokio::fs::create_dir_all(path.with_extension("json.tmp")).await.unwrap();

        let err = ledger
            .submit_transfer(Transfer {
                from: "frodo".into(),
                to: "sam".into(),
                amount: coins(&ledger, "1gp"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.resource_error(), Some(LedgerError::Store(_))));
        assert_eq!(ledger.get_balance("frodo").await.unwrap(), coins(&ledger, "2gp"));
        assert!(ledger.get_balance("sam").await.unwrap().is_empty());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_transfers_do_not_lose_updates() {
        let ledger = ledger();
        ledger.deposit("bank", coins(&ledger, "100gp")).await.unwrap();
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            let amount = coins(&ledger, "1gp");
            tasks.push(tokio::spawn(async move {
                ledger
                    .submit_transfer(Transfer {
                        from: "bank".into(),
                        to: "frodo".into(),
                        amount,
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(ledger.get_balance("frodo").await.unwrap().convert_to_base(), 2000);
        assert_eq!(ledger.get_balance("bank").await.unwrap().convert_to_base(), 8000);
    }
}

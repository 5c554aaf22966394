//! Builds a one-transaction ledger for transaction requests (§4.3).
//!
//! Draws the primary transaction number and any auxiliary closing numbers,
//! attaches the operation's `Item`s, and attaches a `BalanceStatement` (for
//! balance-changing operations) or a `TransactionStatement` (for ones that
//! only commit numbers). On any failure during construction, every drawn
//! number is returned to `available` — this builder is the only place
//! numbers are drawn speculatively before a request is known to be sound.

use crate::client::number_manager::{NumberManager, SINGLE_TRANSACTION_MIN};
use crate::client::request_builder::RequestBuilder;
use crate::error::Error;
use crate::types::envelope::RequestPayload;
use crate::types::ids::{AccountId, NymId, ServerId, TransactionNumber};
use crate::types::statement::{BalanceStatement, Statement, TransactionStatement};
use crate::types::{Item, OutgoingEnvelope, ReceiptDigest};
use crate::wallet::Wallet;

/// Numbers drawn for one transaction: a primary plus zero or more
/// auxiliary closing numbers.
pub struct DrawnNumbers {
    pub primary: TransactionNumber,
    pub auxiliary: Vec<TransactionNumber>,
}

impl DrawnNumbers {
    pub fn all(&self) -> Vec<TransactionNumber> {
        let mut v = vec![self.primary];
        v.extend(&self.auxiliary);
        v
    }
}

pub struct TransactionBuilder<'a> {
    numbers: &'a NumberManager,
    requests: &'a RequestBuilder,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(numbers: &'a NumberManager, requests: &'a RequestBuilder) -> Self {
        Self { numbers, requests }
    }

    /// Draws the primary plus every auxiliary number this transaction
    /// needs, refusing below [`SINGLE_TRANSACTION_MIN`] (§4.1) even when
    /// the transaction itself only spends one number — callers that need a
    /// higher floor (market offers, basket exchanges) draw enough
    /// auxiliary numbers that their own count already exceeds it.
    fn draw(&self, nym: &NymId, server: &ServerId, auxiliary_count: usize) -> Result<DrawnNumbers, Error> {
        let mut drawn =
            self.numbers.draw_many_with_floor(nym, server, 1 + auxiliary_count, SINGLE_TRANSACTION_MIN)?;
        let primary = drawn.remove(0);
        Ok(DrawnNumbers { primary, auxiliary: drawn })
    }

    fn rollback(&self, nym: &NymId, server: &ServerId, numbers: &DrawnNumbers) {
        for n in numbers.all() {
            self.numbers.return_unused(nym, server, n);
        }
    }

    fn commit(&self, nym: &NymId, server: &ServerId, numbers: &DrawnNumbers) {
        self.numbers.confirm_tentative(nym, server, &numbers.all());
    }

    /// Build a balance-changing transaction (cheque deposit, cash
    /// withdrawal/deposit, basket exchange sub-leg, dividend, ...).
    #[allow(clippy::too_many_arguments)]
    pub fn build_balance_transaction(
        &self,
        wallet: &mut Wallet,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        delta: i64,
        items: Vec<Item>,
        auxiliary_count: usize,
        command: impl Into<String>,
    ) -> Result<(OutgoingEnvelope, DrawnNumbers), Error> {
        let drawn = self.draw(nym_id, server_id, auxiliary_count)?;

        let build_result = (|| -> Result<OutgoingEnvelope, Error> {
            let account = wallet.account(account_id)?;
            if delta < 0 && account.balance() + delta < 0 {
                return Err(Error::InsufficientFunds {
                    balance: account.balance(),
                    required: -delta,
                });
            }

            let inbox_receipts: Vec<ReceiptDigest> = account
                .inbox
                .entries()
                .iter()
                .map(|e| ReceiptDigest { transaction_number: e.transaction_number, hash: format!("{:?}", e.body) })
                .collect();
            let outbox_receipts: Vec<ReceiptDigest> = account
                .outbox
                .entries()
                .iter()
                .map(|e| ReceiptDigest { transaction_number: e.transaction_number, hash: format!("{:?}", e.body) })
                .collect();

            let statement = BalanceStatement::new(
                account_id.clone(),
                account.balance(),
                delta,
                inbox_receipts,
                outbox_receipts,
            );
            if !statement.is_internally_consistent() {
                return Err(Error::Internal("balance statement failed local consistency check".into()));
            }

            let tx = crate::types::TransactionRequest {
                primary_number: drawn.primary,
                auxiliary_numbers: drawn.auxiliary.clone(),
                items,
                statement: Statement::Balance(statement),
            };

            self.requests
                .build(wallet, nym_id, server_id, command, RequestPayload::Transaction(tx))
        })();

        match build_result {
            Ok(envelope) => {
                self.commit(nym_id, server_id, &drawn);
                Ok((envelope, drawn))
            }
            Err(e) => {
                self.rollback(nym_id, server_id, &drawn);
                Err(e)
            }
        }
    }

    /// Build a transaction that only commits numbers (market offers, smart
    /// contract confirmation/activation) — no balance change, so it
    /// carries a `TransactionStatement` instead.
    pub fn build_number_only_transaction(
        &self,
        wallet: &mut Wallet,
        nym_id: &NymId,
        server_id: &ServerId,
        items: Vec<Item>,
        auxiliary_count: usize,
        command: impl Into<String>,
    ) -> Result<(OutgoingEnvelope, DrawnNumbers), Error> {
        let drawn = self.draw(nym_id, server_id, auxiliary_count)?;

        let build_result = (|| -> Result<OutgoingEnvelope, Error> {
            let statement = TransactionStatement::new(drawn.all());
            let tx = crate::types::TransactionRequest {
                primary_number: drawn.primary,
                auxiliary_numbers: drawn.auxiliary.clone(),
                items,
                statement: Statement::Transaction(statement),
            };
            self.requests
                .build(wallet, nym_id, server_id, command, RequestPayload::Transaction(tx))
        })();

        match build_result {
            Ok(envelope) => {
                self.commit(nym_id, server_id, &drawn);
                Ok((envelope, drawn))
            }
            Err(e) => {
                self.rollback(nym_id, server_id, &drawn);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetAccount, AssetId, Nym};
    use crate::wallet::fs::DataFolder;

    fn setup() -> (Wallet, NumberManager, RequestBuilder, NymId, ServerId, AccountId) {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-tb-test"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");
        let account_id = AccountId::from("acct-1");
        let mut account = AssetAccount::new(account_id.clone(), nym_id.clone(), AssetId::from("usd"), server_id.clone());
        account.apply_delta(500);
        wallet.insert_account(account).unwrap();
        (wallet, NumberManager::new(), RequestBuilder::new(), nym_id, server_id, account_id)
    }

    #[test]
    fn insufficient_numbers_is_refused_and_nothing_is_drawn() {
        let (mut wallet, numbers, requests, nym_id, server_id, account_id) = setup();
        let builder = TransactionBuilder::new(&numbers, &requests);
        // No numbers seeded at all.
        let result = builder.build_balance_transaction(
            &mut wallet,
            &nym_id,
            &server_id,
            &account_id,
            -100,
            vec![],
            0,
            "writeCheque",
        );
        assert!(matches!(result, Err(Error::InsufficientNumbers { .. })));
    }

    #[test]
    fn insufficient_funds_rolls_back_drawn_numbers() {
        let (mut wallet, numbers, requests, nym_id, server_id, account_id) = setup();
        numbers.seed_available(&nym_id, &server_id, vec![TransactionNumber(101), TransactionNumber(102)]);
        let builder = TransactionBuilder::new(&numbers, &requests);

        let result = builder.build_balance_transaction(
            &mut wallet,
            &nym_id,
            &server_id,
            &account_id,
            -10_000,
            vec![],
            0,
            "writeCheque",
        );
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(numbers.available_count(&nym_id, &server_id), 2);
    }

    #[test]
    fn successful_build_commits_drawn_numbers_as_issued() {
        let (mut wallet, numbers, requests, nym_id, server_id, account_id) = setup();
        numbers.seed_available(&nym_id, &server_id, vec![TransactionNumber(101), TransactionNumber(102)]);
        let builder = TransactionBuilder::new(&numbers, &requests);

        let (_, drawn) = builder
            .build_balance_transaction(&mut wallet, &nym_id, &server_id, &account_id, -100, vec![], 0, "writeCheque")
            .unwrap();

        assert!(numbers.is_issued(&nym_id, &server_id, drawn.primary));
        assert_eq!(numbers.available_count(&nym_id, &server_id), 1);
    }

    #[test]
    fn single_transaction_below_low_water_mark_is_refused() {
        let (mut wallet, numbers, requests, nym_id, server_id, account_id) = setup();
        numbers.seed_available(&nym_id, &server_id, vec![TransactionNumber(101)]);
        let builder = TransactionBuilder::new(&numbers, &requests);

        let result = builder.build_balance_transaction(
            &mut wallet,
            &nym_id,
            &server_id,
            &account_id,
            -100,
            vec![],
            0,
            "writeCheque",
        );
        assert!(matches!(result, Err(Error::InsufficientNumbers { .. })));
        assert_eq!(numbers.available_count(&nym_id, &server_id), 1);
    }
}

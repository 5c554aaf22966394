//! Cancel a live recurring item (§4.10).
//!
//! Cancels any live recurring item (market offer, payment plan, smart
//! contract) by its transaction number. Costs one fresh number for the
//! cancel request itself and carries a transaction statement, not a
//! balance statement. On success the server returns a `finalReceipt` in
//! the inbox; closing that receipt (via `RecordEngine`) is what actually
//! frees the item's opening/closing numbers — this call only submits the
//! cancellation.

use crate::client::number_manager::NumberManager;
use crate::client::request_builder::RequestBuilder;
use crate::client::transaction_builder::{DrawnNumbers, TransactionBuilder};
use crate::error::Error;
use crate::types::envelope::Item;
use crate::types::ids::{NymId, ServerId, TransactionNumber};
use crate::types::OutgoingEnvelope;
use crate::wallet::Wallet;

pub fn cancel_cron_item(
    numbers: &NumberManager,
    requests: &RequestBuilder,
    wallet: &mut Wallet,
    nym_id: &NymId,
    server_id: &ServerId,
    target_number: TransactionNumber,
) -> Result<(OutgoingEnvelope, DrawnNumbers), Error> {
    let builder = TransactionBuilder::new(numbers, requests);
    builder.build_number_only_transaction(
        wallet,
        nym_id,
        server_id,
        vec![Item::CancelCronItem { target_number }],
        0,
        "cancelCronItem",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nym;
    use crate::wallet::fs::DataFolder;

    #[test]
    fn cancel_draws_exactly_one_fresh_number() {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-cancel-test"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");

        let numbers = NumberManager::new();
        numbers.seed_available(&nym_id, &server_id, vec![TransactionNumber(101), TransactionNumber(102)]);
        let requests = RequestBuilder::new();

        let (_, drawn) = cancel_cron_item(
            &numbers,
            &requests,
            &mut wallet,
            &nym_id,
            &server_id,
            TransactionNumber(500),
        )
        .unwrap();

        assert!(drawn.auxiliary.is_empty());
        assert!(numbers.is_issued(&nym_id, &server_id, drawn.primary));
        // Only one number is actually spent on the cancel request itself,
        // but §4.1's single-transaction low-water mark still reserves a
        // floor of `SINGLE_TRANSACTION_MIN` before the draw is allowed.
        assert_eq!(numbers.available_count(&nym_id, &server_id), 1);
    }

    #[test]
    fn insufficient_numbers_refuses_cleanly() {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-cancel-test-2"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");

        let numbers = NumberManager::new();
        let requests = RequestBuilder::new();

        let result = cancel_cron_item(
            &numbers,
            &requests,
            &mut wallet,
            &nym_id,
            &server_id,
            TransactionNumber(500),
        );
        assert!(matches!(result, Err(Error::InsufficientNumbers { .. })));
    }
}

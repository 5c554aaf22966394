//! Market offers (§4.10, §6 CLI surface `issue_market_offer`/`get_market_*`).
//!
//! A market offer is a cron item like a payment plan or smart contract:
//! it stays live on the server's recurring-execution loop until it
//! trades, expires, or is pulled with [`cancel_cron`](super::cancel_cron).
//! Issuing one costs [`MARKET_OFFER_MIN`](crate::client::number_manager::MARKET_OFFER_MIN)
//! numbers — one primary plus two closings, mirroring the opening/closing
//! pair a payment plan attaches (§4.1, §4.8) — and carries a transaction
//! statement rather than a balance statement: posting the offer commits
//! numbers but does not itself move funds.

use serde::{Deserialize, Serialize};

use crate::client::number_manager::{NumberManager, MARKET_OFFER_MIN};
use crate::client::request_builder::RequestBuilder;
use crate::client::transaction_builder::{DrawnNumbers, TransactionBuilder};
use crate::error::Error;
use crate::types::envelope::Item;
use crate::types::ids::{AccountId, AssetId, NymId, ServerId};
use crate::types::OutgoingEnvelope;
use crate::wallet::Wallet;

/// The terms of one market offer: scale and price are left as plain
/// integers — the market-matching algorithm itself is server-side and out
/// of scope (§1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketOfferTerms {
    pub asset: AssetId,
    pub currency: AssetId,
    pub server: ServerId,
    pub selling_account: AccountId,
    pub scale: i64,
    pub min_increment: i64,
    pub price_per_scale: i64,
    pub is_bid: bool,
}

/// Issue a market offer: draws `MARKET_OFFER_MIN` numbers (one primary,
/// two closings) and submits a number-only transaction carrying the
/// serialized offer terms.
pub fn issue_market_offer(
    numbers: &NumberManager,
    requests: &RequestBuilder,
    wallet: &mut Wallet,
    nym_id: &NymId,
    server_id: &ServerId,
    terms: MarketOfferTerms,
) -> Result<(OutgoingEnvelope, DrawnNumbers), Error> {
    let serialized_offer = serde_json::to_string(&terms)?;
    let builder = TransactionBuilder::new(numbers, requests);
    builder.build_number_only_transaction(
        wallet,
        nym_id,
        server_id,
        vec![Item::MarketOffer { serialized_offer }],
        MARKET_OFFER_MIN - 1,
        "issueMarketOffer",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::TransactionNumber;
    use crate::types::Nym;
    use crate::wallet::fs::DataFolder;

    fn terms() -> MarketOfferTerms {
        MarketOfferTerms {
            asset: AssetId::from("btc"),
            currency: AssetId::from("usd"),
            server: ServerId::from("srv1"),
            selling_account: AccountId::from("acct-1"),
            scale: 1,
            min_increment: 1,
            price_per_scale: 50_000,
            is_bid: false,
        }
    }

    #[test]
    fn issuing_draws_exactly_the_market_offer_minimum() {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-market-test"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");

        let numbers = NumberManager::new();
        numbers.seed_available(
            &nym_id,
            &server_id,
            vec![TransactionNumber(1), TransactionNumber(2), TransactionNumber(3)],
        );
        let requests = RequestBuilder::new();

        let (_, drawn) =
            issue_market_offer(&numbers, &requests, &mut wallet, &nym_id, &server_id, terms()).unwrap();

        assert_eq!(drawn.all().len(), MARKET_OFFER_MIN);
        assert_eq!(numbers.available_count(&nym_id, &server_id), 0);
    }

    #[test]
    fn below_low_water_mark_refuses_and_rolls_back() {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-market-test-2"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");

        let numbers = NumberManager::new();
        numbers.seed_available(&nym_id, &server_id, vec![TransactionNumber(1), TransactionNumber(2)]);
        let requests = RequestBuilder::new();

        let result = issue_market_offer(&numbers, &requests, &mut wallet, &nym_id, &server_id, terms());
        assert!(matches!(result, Err(Error::InsufficientNumbers { .. })));
        assert_eq!(numbers.available_count(&nym_id, &server_id), 2);
    }
}

//! Basket exchange (§4.9).
//!
//! Exchanging a basket of assets atomically debits/credits the main
//! basket account and every sub-account in one `exchangeBasket`
//! transaction. The client draws one number for the main transaction, one
//! closing number per sub-account, and one closing number for the main
//! account — [`basket_exchange_min`](crate::client::number_manager::basket_exchange_min)
//! is the matching low-water mark. The balance statement itself covers a
//! zero net change on the main account; basket receipts account for the
//! per-sub-account movement.

use crate::client::number_manager::NumberManager;
use crate::client::request_builder::RequestBuilder;
use crate::error::Error;
use crate::types::envelope::{Item, RequestPayload};
use crate::types::ids::{AccountId, NymId, ServerId, TransactionNumber};
use crate::types::statement::{BalanceStatement, Statement};
use crate::types::{OutgoingEnvelope, ReceiptDigest};
use crate::wallet::Wallet;

/// Numbers drawn for one basket exchange: the main transaction number, one
/// closing number per sub-account, and the main account's own closing
/// number.
pub struct BasketDrawnNumbers {
    pub main_transaction: TransactionNumber,
    pub sub_account_closings: Vec<TransactionNumber>,
    pub main_closing: TransactionNumber,
}

impl BasketDrawnNumbers {
    pub fn all(&self) -> Vec<TransactionNumber> {
        let mut v = vec![self.main_transaction];
        v.extend(&self.sub_account_closings);
        v.push(self.main_closing);
        v
    }
}

/// Exchange a basket: `sub_account_deltas` is one `(sub-account, delta)`
/// pair per sub-asset, in basket order. On any failure every drawn number
/// is returned unharvested.
pub fn exchange_basket(
    numbers: &NumberManager,
    requests: &RequestBuilder,
    wallet: &mut Wallet,
    nym_id: &NymId,
    server_id: &ServerId,
    main_account_id: &AccountId,
    sub_account_deltas: Vec<(AccountId, i64)>,
) -> Result<(OutgoingEnvelope, BasketDrawnNumbers), Error> {
    let sub_count = sub_account_deltas.len();
    let needed = crate::client::number_manager::basket_exchange_min(sub_count);
    let mut drawn = numbers.draw_many(nym_id, server_id, needed)?;
    let main_transaction = drawn.remove(0);
    let main_closing = drawn.pop().expect("needed includes the main closing number");
    let sub_account_closings = drawn;
    let drawn_numbers = BasketDrawnNumbers { main_transaction, sub_account_closings, main_closing };

    let build_result = (|| -> Result<OutgoingEnvelope, Error> {
        let account = wallet.account(main_account_id)?;
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

        // Zero net change on the main account: basket receipts carry the
        // per-sub-account movement instead.
        let statement = BalanceStatement::new(
            main_account_id.clone(),
            account.balance(),
            0,
            inbox_receipts,
            outbox_receipts,
        );
        if !statement.is_internally_consistent() {
            return Err(Error::Internal("basket balance statement failed local consistency check".into()));
        }

        let tx = crate::types::TransactionRequest {
            primary_number: drawn_numbers.main_transaction,
            auxiliary_numbers: {
                let mut aux = drawn_numbers.sub_account_closings.clone();
                aux.push(drawn_numbers.main_closing);
                aux
            },
            items: vec![Item::ExchangeBasket { sub_account_deltas: sub_account_deltas.clone() }],
            statement: Statement::Balance(statement),
        };

        requests.build(wallet, nym_id, server_id, "exchangeBasket", RequestPayload::Transaction(tx))
    })();

    match build_result {
        Ok(envelope) => {
            numbers.confirm_tentative(nym_id, server_id, &drawn_numbers.all());
            Ok((envelope, drawn_numbers))
        }
        Err(e) => {
            for n in drawn_numbers.all() {
                numbers.return_unused(nym_id, server_id, n);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetAccount, AssetId, Nym};
    use crate::wallet::fs::DataFolder;

    fn setup() -> (Wallet, NumberManager, RequestBuilder, NymId, ServerId, AccountId) {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-basket-test"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        let server_id = ServerId::from("srv1");
        let main_account_id = AccountId::from("basket-acct");
        wallet
            .insert_account(AssetAccount::new(
                main_account_id.clone(),
                nym_id.clone(),
                AssetId::from("basket-usd"),
                server_id.clone(),
            ))
            .unwrap();
        (wallet, NumberManager::new(), RequestBuilder::new(), nym_id, server_id, main_account_id)
    }

    // §8 scenario 5: basket with 2 sub-accounts requires 1+2+1=4 numbers.
    #[test]
    fn two_sub_accounts_requires_exactly_four_numbers() {
        let (mut wallet, numbers, requests, nym_id, server_id, main_account_id) = setup();
        numbers.seed_available(
            &nym_id,
            &server_id,
            vec![TransactionNumber(1), TransactionNumber(2), TransactionNumber(3), TransactionNumber(4)],
        );

        let deltas = vec![(AccountId::from("sub-a"), -10), (AccountId::from("sub-b"), 10)];
        let (_, drawn) = exchange_basket(
            &numbers,
            &requests,
            &mut wallet,
            &nym_id,
            &server_id,
            &main_account_id,
            deltas,
        )
        .unwrap();

        assert_eq!(drawn.all().len(), 4);
        assert_eq!(numbers.available_count(&nym_id, &server_id), 0);
        assert!(numbers.is_issued(&nym_id, &server_id, drawn.main_transaction));
    }

    #[test]
    fn insufficient_numbers_refuses_and_draws_nothing() {
        let (mut wallet, numbers, requests, nym_id, server_id, main_account_id) = setup();
        numbers.seed_available(
            &nym_id,
            &server_id,
            vec![TransactionNumber(1), TransactionNumber(2), TransactionNumber(3)],
        );

        let deltas = vec![(AccountId::from("sub-a"), -10), (AccountId::from("sub-b"), 10)];
        let result = exchange_basket(
            &numbers,
            &requests,
            &mut wallet,
            &nym_id,
            &server_id,
            &main_account_id,
            deltas,
        );

        assert!(matches!(result, Err(Error::InsufficientNumbers { .. })));
        assert_eq!(numbers.available_count(&nym_id, &server_id), 3);
    }
}

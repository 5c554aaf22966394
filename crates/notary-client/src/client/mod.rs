//! The `Client`: one instance per process, per wallet, per connection (§2, §5).
//!
//! `Client` is the single entry point that owns every subsystem in the
//! dependency order from §2's table: [`Wallet`] at the root, then
//! [`number_manager::NumberManager`], [`request_builder::RequestBuilder`],
//! [`transaction_builder::TransactionBuilder`] (constructed per call, since
//! it only borrows the two managers above), [`sent_outbuffer::SentOutbuffer`],
//! and a single [`transport::Transport`] behind a per-instance lock so a
//! request/response pair is atomic from the client's point of view (§5).
//! `RecordEngine`, `PurseOwnership`, `PasswordRotation`, `RecurringBuilder`,
//! and basket/cancel-cron are free functions in their own modules; `Client`
//! is what wires a wallet's state through them.

pub mod basket;
pub mod cancel_cron;
pub mod market;
pub mod number_manager;
pub mod outpayments;
pub mod password_rotation;
pub mod purse_ownership;
pub mod record_engine;
pub mod recurring_builder;
pub mod request_builder;
pub mod sent_outbuffer;
pub mod transaction_builder;
pub mod transport;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::clock::{system_clock, SharedClock};
use crate::error::Error;
use crate::types::envelope::{Item, ReplyOutcome};
use crate::types::ids::{AccountId, AssetId, NymId, ServerId, TransactionNumber};
use crate::types::instrument::{
    Cheque, InstrumentCommon, PartyId, PaymentInstrument, PaymentPlan, SmartContract,
    SmartContractAccount, SmartContractParty, ValidityWindow, Voucher,
};
use crate::types::ledger::Ledger;
use crate::types::outpayment::{IncomingPaymentEntry, OutpaymentEntry};
use crate::wallet::fs::DataFolder;
use crate::wallet::Wallet;

use number_manager::NumberManager;
use outpayments::ReconcileOutcome;
use record_engine::{RecordBoxes, RecordDecisionInput, SourceBox};
use request_builder::RequestBuilder;
use sent_outbuffer::{SentEntry, SentOutbuffer};
use transaction_builder::{DrawnNumbers, TransactionBuilder};
use transport::Transport;

/// One process/wallet/connection instance (§2, §5). Not `Clone` — a single
/// instance owns one wallet and one connection, and suspension points
/// (`transport.send`, `transport.receive`, passphrase prompts) only ever
/// happen on `self`, never on a copy racing another thread's view of the
/// same wallet.
pub struct Client {
    wallet: Mutex<Wallet>,
    numbers: NumberManager,
    requests: RequestBuilder,
    outbuffer: SentOutbuffer,
    transport: tokio::sync::Mutex<Arc<dyn Transport>>,
    clock: SharedClock,
}

impl Client {
    /// Open a wallet rooted at `data_folder`, unlocked with `passphrase`,
    /// talking to the notary over `transport`.
    pub fn open(data_folder: DataFolder, passphrase: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            wallet: Mutex::new(Wallet::new(data_folder, passphrase)),
            numbers: NumberManager::new(),
            requests: RequestBuilder::new(),
            outbuffer: SentOutbuffer::new(),
            transport: tokio::sync::Mutex::new(transport),
            clock: system_clock(),
        }
    }

    /// Pin a deterministic clock, for tests that need validity windows to
    /// be reproducible instead of racing real time.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn wallet(&self) -> MutexGuard<'_, Wallet> {
        self.wallet.lock().unwrap()
    }

    pub fn numbers(&self) -> &NumberManager {
        &self.numbers
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Send one envelope, tracking it in the sent outbuffer first and
    /// updating the request builder's pinned nymbox hash / ack list on
    /// reply (§4.2, §4.5). A transport failure leaves the entry in the
    /// outbuffer untouched — per §5/§7, a timed-out request is *not*
    /// automatically harvested; only the next nymbox reconciliation
    /// classifies it.
    async fn send(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        envelope: crate::types::OutgoingEnvelope,
        drawn: &DrawnNumbers,
    ) -> Result<crate::types::IncomingEnvelope, Error> {
        let transport = self.transport.lock().await;
        self.outbuffer.track(SentEntry {
            request_number: envelope.body.request_number,
            nym: nym_id.clone(),
            server: server_id.clone(),
            primary_number: drawn.primary,
            auxiliary_numbers: drawn.auxiliary.clone(),
            sent_at: self.now(),
            reply: None,
        });

        let reply = transport.send_receive(envelope).await?;
        self.outbuffer
            .record_reply(nym_id, server_id, reply.body.request_number, reply.body.outcome);
        self.requests.on_reply(
            nym_id,
            server_id,
            reply.body.request_number,
            reply.body.new_nymbox_hash.clone(),
        );
        // Delivered — drop it from the outbuffer now rather than waiting
        // for the next nymbox reconciliation pass to find its reply-notice.
        self.outbuffer
            .remove_by_request_number(nym_id, server_id, reply.body.request_number);
        Ok(reply)
    }

    /// Send a plain message request that spends no transaction number
    /// (e.g. a market-offer-book query) — no outbuffer tracking, since
    /// there is nothing to harvest or reconcile.
    async fn send_query(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        envelope: crate::types::OutgoingEnvelope,
    ) -> Result<crate::types::IncomingEnvelope, Error> {
        let transport = self.transport.lock().await;
        let reply = transport.send_receive(envelope).await?;
        self.requests.on_reply(
            nym_id,
            server_id,
            reply.body.request_number,
            reply.body.new_nymbox_hash.clone(),
        );
        Ok(reply)
    }

    /// Classify a reply outcome against the numbers drawn for it, per
    /// §4.5/§7: message failure harvests everything, transaction failure
    /// burns the primary but harvests auxiliary numbers, success commits
    /// nothing further (the numbers are already confirmed issued).
    fn harvest_on_failure(&self, nym_id: &NymId, server_id: &ServerId, drawn: &DrawnNumbers, outcome: ReplyOutcome) {
        match outcome {
            ReplyOutcome::Success => {}
            ReplyOutcome::MessageFailure => {
                for n in drawn.all() {
                    self.numbers.return_unused(nym_id, server_id, n);
                }
            }
            ReplyOutcome::TransactionFailure => {
                for n in &drawn.auxiliary {
                    self.numbers.return_unused(nym_id, server_id, *n);
                }
            }
        }
    }

    // ── §4.3 money transactions ──────────────────────────────────────

    /// Write a cheque (a negative `amount` is an invoice, §4.3). Purely
    /// local — a cheque only touches the server when the recipient deposits
    /// it; writing one just draws a number from the local pool and files
    /// the cheque in the sender's outpayments queue for later
    /// reconciliation (§4.5, §4.4).
    pub fn write_cheque(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        amount: i64,
        validity: ValidityWindow,
        memo: Option<String>,
    ) -> Result<Cheque, Error> {
        let asset = {
            let wallet = self.wallet.lock().unwrap();
            wallet.account(account_id)?.asset().clone()
        };
        let number = self.numbers.draw(nym_id, server_id)?;
        self.numbers.confirm_tentative(nym_id, server_id, &[number]);

        let common = InstrumentCommon { asset, server: server_id.clone(), validity, memo };
        let cheque = match Cheque::new(common, account_id.clone(), nym_id.clone(), number, amount) {
            Ok(c) => c,
            Err(e) => {
                self.numbers.return_unused(nym_id, server_id, number);
                return Err(e);
            }
        };

        let mut wallet = self.wallet.lock().unwrap();
        let nym = wallet.nym_mut(nym_id)?;
        nym.outpayments
            .push(OutpaymentEntry::new(PaymentInstrument::Cheque(cheque.clone()), self.now()));
        Ok(cheque)
    }

    /// Deposit a cheque (or invoice) at `account_id`, crediting or
    /// debiting the depositor's own account by its (possibly negative)
    /// amount.
    pub async fn deposit_cheque(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        cheque: &Cheque,
    ) -> Result<(), Error> {
        if cheque.common.validity.is_expired(self.now()) {
            return Err(Error::Expired { valid_to: cheque.common.validity.valid_to, now: self.now() });
        }
        let serialized = serde_json::to_string(cheque)?;
        let tb = TransactionBuilder::new(&self.numbers, &self.requests);
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            tb.build_balance_transaction(
                &mut wallet,
                nym_id,
                server_id,
                account_id,
                cheque.amount,
                vec![Item::DepositCheque { serialized_cheque: serialized }],
                0,
                "depositCheque",
            )?
        };
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "depositCheque rejected".into()),
            ));
        }
        let mut wallet = self.wallet.lock().unwrap();
        wallet.account_mut(account_id)?.apply_delta(cheque.amount);
        Ok(())
    }

    /// Discard a cheque locally before it's ever sent — simply drops the
    /// local copy without touching server state or the transaction number
    /// (the number stays issued; the recipient could still deposit it).
    pub fn discard_cheque(&self, nym_id: &NymId, index: usize) -> Result<OutpaymentEntry, Error> {
        let mut wallet = self.wallet.lock().unwrap();
        let nym = wallet.nym_mut(nym_id)?;
        if index >= nym.outpayments.len() {
            return Err(Error::NotFound("outpayment index out of range".into()));
        }
        Ok(nym.outpayments.remove(index))
    }

    /// Withdraw a voucher: a cashier's-cheque drawn on the server's
    /// reserve. Rejected with a remitter field per the §9 open question
    /// (no `voucherReceipt` state machine exists yet).
    pub async fn withdraw_voucher(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        amount: i64,
        validity: ValidityWindow,
        memo: Option<String>,
    ) -> Result<Voucher, Error> {
        let tb = TransactionBuilder::new(&self.numbers, &self.requests);
        let (asset, envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            let asset = wallet.account(account_id)?.asset().clone();
            let (envelope, drawn) = tb.build_balance_transaction(
                &mut wallet,
                nym_id,
                server_id,
                account_id,
                -amount,
                vec![Item::WithdrawVoucher { amount }],
                0,
                "withdrawVoucher",
            )?;
            (asset, envelope, drawn)
        };
        let common = InstrumentCommon { asset, server: server_id.clone(), validity, memo };
        let voucher = Voucher::new(common, account_id.clone(), nym_id.clone(), drawn.primary, amount)?;
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "withdrawVoucher rejected".into()),
            ));
        }
        Ok(voucher)
    }

    /// Pay a dividend: `amount_per_share` times each shareholder's share
    /// count, written out as one local cheque per shareholder, payable to
    /// that shareholder (§4.3's numeric semantics: total = `amount_per_share
    /// × shares`, rejected up front if the issuer's balance can't cover the
    /// sum across every shareholder). Like [`Client::write_cheque`], no
    /// balance actually moves until each shareholder deposits their cheque —
    /// this only checks solvency and drafts the cheques.
    pub fn pay_dividend(
        &self,
        issuer_nym: &NymId,
        server_id: &ServerId,
        issuer_account: &AccountId,
        amount_per_share: i64,
        shareholders: Vec<(NymId, i64)>,
        validity: ValidityWindow,
        memo: Option<String>,
    ) -> Result<Vec<Cheque>, Error> {
        let total: i64 = shareholders.iter().map(|(_, shares)| shares * amount_per_share).sum();
        let balance = {
            let wallet = self.wallet.lock().unwrap();
            wallet.account(issuer_account)?.balance()
        };
        if balance < total {
            return Err(Error::InsufficientFunds { balance, required: total });
        }

        let mut cheques = Vec::with_capacity(shareholders.len());
        for (shareholder, shares) in shareholders {
            let share_amount = shares * amount_per_share;
            if share_amount == 0 {
                continue;
            }
            let mut cheque = self.write_cheque(
                issuer_nym,
                server_id,
                issuer_account,
                share_amount,
                validity,
                memo.clone(),
            )?;
            cheque.recipient_nym = Some(shareholder);
            cheques.push(cheque);
        }
        Ok(cheques)
    }

    // ── §4.6 cash purses ──────────────────────────────────────────────

    /// Withdraw cash: debit `account_id` and mint `amount` blinded tokens
    /// into a freshly owned purse. The blinding protocol itself is out of
    /// scope (§1) — this pushes opaque placeholder tokens.
    pub async fn withdraw_cash(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        asset_id: &AssetId,
        amount: i64,
    ) -> Result<crate::types::CashPurse, Error> {
        let tb = TransactionBuilder::new(&self.numbers, &self.requests);
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            tb.build_balance_transaction(
                &mut wallet,
                nym_id,
                server_id,
                account_id,
                -amount,
                vec![Item::WithdrawCash { amount }],
                0,
                "withdrawCash",
            )?
        };
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "withdrawCash rejected".into()),
            ));
        }

        let mut purse =
            crate::types::CashPurse::new_for_nym(server_id.clone(), asset_id.clone(), nym_id.clone());
        let wallet = self.wallet.lock().unwrap();
        let nym = wallet.nym(nym_id)?;
        let owner = purse_ownership::nym_owner(nym);
        for i in 0..amount.max(0) {
            purse_ownership::push(&mut purse, &owner, format!("token-{i}").as_bytes())?;
        }
        Ok(purse)
    }

    /// Deposit a purse at `account_id`, crediting its token count.
    pub async fn deposit_cash(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        account_id: &AccountId,
        purse: &crate::types::CashPurse,
    ) -> Result<(), Error> {
        let amount = purse.len() as i64;
        let serialized = serde_json::to_string(purse)?;
        let tb = TransactionBuilder::new(&self.numbers, &self.requests);
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            tb.build_balance_transaction(
                &mut wallet,
                nym_id,
                server_id,
                account_id,
                amount,
                vec![Item::DepositCash { purse: serialized }],
                0,
                "depositCash",
            )?
        };
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "depositCash rejected".into()),
            ));
        }
        let mut wallet = self.wallet.lock().unwrap();
        wallet.account_mut(account_id)?.apply_delta(amount);
        Ok(())
    }

    // ── §4.9 basket exchange ──────────────────────────────────────────

    /// Register a new basket asset contract locally. This is the
    /// definition step — declaring what a basket is made of — distinct
    /// from [`Client::exchange_basket`], which trades against one.
    pub fn issue_basket(
        &self,
        id: AssetId,
        name: String,
        sub_assets: Vec<crate::types::asset_contract::SubAsset>,
        minimum_transfer: u64,
    ) -> Result<(), Error> {
        let mut wallet = self.wallet.lock().unwrap();
        wallet.insert_asset(crate::types::AssetContract::Basket { id, name, sub_assets, minimum_transfer })
    }

    pub async fn exchange_basket(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        main_account_id: &AccountId,
        sub_account_deltas: Vec<(AccountId, i64)>,
    ) -> Result<(), Error> {
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            basket::exchange_basket(
                &self.numbers,
                &self.requests,
                &mut wallet,
                nym_id,
                server_id,
                main_account_id,
                sub_account_deltas.clone(),
            )?
        };
        let all = drawn.all();
        let transaction_builder_numbers =
            DrawnNumbers { primary: drawn.main_transaction, auxiliary: all[1..].to_vec() };
        let reply = self.send(nym_id, server_id, envelope, &transaction_builder_numbers).await?;
        self.harvest_on_failure(nym_id, server_id, &transaction_builder_numbers, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "exchangeBasket rejected".into()),
            ));
        }
        let mut wallet = self.wallet.lock().unwrap();
        for (sub_account, delta) in sub_account_deltas {
            wallet.account_mut(&sub_account)?.apply_delta(delta);
        }
        Ok(())
    }

    // ── §4.10 market offers ───────────────────────────────────────────

    /// Issue a market offer (§4.1 low-water mark: `<3` refuses). Like a
    /// payment plan or smart contract this is a cron item — it stays live
    /// until it trades, expires, or is pulled via
    /// [`Client::cancel_cron_item`].
    pub async fn issue_market_offer(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        terms: market::MarketOfferTerms,
    ) -> Result<(), Error> {
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            market::issue_market_offer(&self.numbers, &self.requests, &mut wallet, nym_id, server_id, terms)?
        };
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "issueMarketOffer rejected".into()),
            ));
        }
        Ok(())
    }

    /// Query the server's live offer book for one (server, asset) pair.
    /// Purely a message request — no transaction number is spent reading
    /// the book.
    pub async fn get_market_offers(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        asset_id: &AssetId,
    ) -> Result<serde_json::Value, Error> {
        let envelope = {
            let mut wallet = self.wallet.lock().unwrap();
            self.requests.build(
                &mut wallet,
                nym_id,
                server_id,
                "getMarketOffers",
                crate::types::envelope::RequestPayload::Message {
                    command: "getMarketOffers".into(),
                    body: serde_json::json!({ "asset": asset_id }),
                },
            )?
        };
        let reply = self.send_query(nym_id, server_id, envelope).await?;
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "getMarketOffers rejected".into()),
            ));
        }
        Ok(serde_json::Value::Null)
    }

    // ── §4.8 payment plans & smart contracts ─────────────────────────

    pub fn propose_payment_plan(
        &self,
        merchant_nym: &NymId,
        server_id: &ServerId,
        merchant_acct: AccountId,
        common: InstrumentCommon,
    ) -> Result<PaymentPlan, Error> {
        recurring_builder::propose_payment_plan(&self.numbers, merchant_nym, server_id, merchant_acct, common)
    }

    pub fn confirm_payment_plan(
        &self,
        plan: &mut PaymentPlan,
        payer_nym: &NymId,
        server_id: &ServerId,
        payer_acct: AccountId,
    ) -> Result<(), Error> {
        recurring_builder::confirm_payment_plan(&self.numbers, plan, payer_nym, server_id, payer_acct)
    }

    /// Submit a confirmed plan to activate it on cron. The payer is the
    /// activator (§4.8).
    pub async fn deposit_payment_plan(
        &self,
        payer_nym: &NymId,
        server_id: &ServerId,
        plan: &PaymentPlan,
    ) -> Result<(), Error> {
        if !plan.is_confirmed() {
            return Err(Error::Conflict("payment plan has not been confirmed by a payer".into()));
        }
        let payer_opening = plan
            .payer_opening
            .ok_or_else(|| Error::Internal("confirmed plan missing payer opening number".into()))?;
        let payer_closing = plan
            .payer_closing
            .ok_or_else(|| Error::Internal("confirmed plan missing payer closing number".into()))?;
        let drawn = DrawnNumbers { primary: payer_opening, auxiliary: vec![payer_closing] };
        let serialized = serde_json::to_string(plan)?;
        let envelope = {
            let mut wallet = self.wallet.lock().unwrap();
            self.requests.build(
                &mut wallet,
                payer_nym,
                server_id,
                "activatePaymentPlan",
                crate::types::envelope::RequestPayload::Transaction(crate::types::TransactionRequest {
                    primary_number: drawn.primary,
                    auxiliary_numbers: drawn.auxiliary.clone(),
                    items: vec![Item::ActivateRecurring { serialized_instrument: serialized }],
                    statement: crate::types::statement::Statement::Transaction(
                        crate::types::statement::TransactionStatement::new(drawn.all()),
                    ),
                }),
            )?
        };
        let reply = self.send(payer_nym, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(payer_nym, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "activatePaymentPlan rejected".into()),
            ));
        }
        Ok(())
    }

    pub fn cancel_payment_plan(&self, plan: &mut PaymentPlan, canceler: &NymId, server_id: &ServerId) -> Result<(), Error> {
        recurring_builder::cancel_payment_plan(&self.numbers, plan, canceler, server_id)
    }

    pub fn smart_contract_create(&self, common: InstrumentCommon) -> SmartContract {
        SmartContract::new(common)
    }

    pub fn smart_contract_add_party(&self, contract: &mut SmartContract, party: SmartContractParty) -> Result<(), Error> {
        contract.add_party(party)
    }

    pub fn smart_contract_add_account(
        &self,
        contract: &mut SmartContract,
        account: SmartContractAccount,
    ) -> Result<(), Error> {
        contract.add_account(account)
    }

    pub fn smart_contract_confirm_party(&self, contract: &mut SmartContract, party: PartyId) -> Result<(), Error> {
        contract.confirm_party(party)
    }

    /// Mark an already-attached account as confirmed by its owning party.
    /// Structural bookkeeping only — the contract tracks confirmation per
    /// party (§4.8), so this is really just an existence check that the
    /// account is attached before the party goes on to `confirm_party`.
    pub fn smart_contract_confirm_account(
        &self,
        contract: &SmartContract,
        account_id: &AccountId,
    ) -> Result<(), Error> {
        if !contract.accounts.iter().any(|a| &a.account_id == account_id) {
            return Err(Error::NotFound(format!("account {account_id} not attached to this contract")));
        }
        Ok(())
    }

    /// Append a bylaw/clause/variable/hook/callback to a contract's script
    /// program. These are purely structural (§1 scopes the scripting
    /// language's execution semantics out) — the client stores what the
    /// author wrote without interpreting it.
    pub fn smart_contract_add_bylaw(&self, contract: &mut SmartContract, bylaw: String) {
        contract.script.bylaws.push(bylaw);
    }

    pub fn smart_contract_add_clause(&self, contract: &mut SmartContract, name: String, source: String) {
        contract.script.clauses.push((name, source));
    }

    pub fn smart_contract_add_variable(&self, contract: &mut SmartContract, name: String, value: String) {
        contract.script.variables.push((name, value));
    }

    pub fn smart_contract_add_hook(&self, contract: &mut SmartContract, name: String, clause: String) {
        contract.script.hooks.push((name, clause));
    }

    pub fn smart_contract_add_callback(&self, contract: &mut SmartContract, name: String, clause: String) {
        contract.script.callbacks.push((name, clause));
    }

    /// Trigger a named clause. The scripting language itself is out of
    /// scope (§1) — there is no interpreter to run the clause against, so
    /// this always refuses. Kept as an explicit operation (rather than
    /// omitted) so callers get a clear error instead of a missing method.
    pub fn trigger_clause(&self, _contract: &SmartContract, clause_name: &str) -> Result<(), Error> {
        Err(Error::InvalidInput(format!(
            "cannot trigger clause '{clause_name}': the smart-contract scripting language is out of scope"
        )))
    }

    /// Activate a smart contract. If not every party has confirmed, per
    /// scenario §8.4 this routes to a cancellation of the partially
    /// confirmed contract instead of failing outright, and marks it
    /// canceled. Confirming a party (§4.8) is purely a signature, not a
    /// number draw — only the activator ever draws numbers, and only at
    /// activation itself (`recurring_builder::activate_smart_contract`'s
    /// `activator_opening`/`activator_closing`) — so there is nothing to
    /// harvest back here; activation never got far enough to draw anything.
    pub fn smart_contract_activate(
        &self,
        contract: &mut SmartContract,
        server_id: &ServerId,
        activator_party: &PartyId,
        activator_nym: &NymId,
    ) -> Result<(), Error> {
        if !contract.all_confirmed() {
            contract.canceled = true;
            warn!("smart contract activation attempted before every party confirmed; canceling");
            return Err(Error::Conflict(
                "not every party confirmed; contract has been canceled before activation".into(),
            ));
        }
        recurring_builder::activate_smart_contract(&self.numbers, contract, server_id, activator_party, activator_nym)
    }

    // ── §4.10 cancel cron item ────────────────────────────────────────

    pub async fn cancel_cron_item(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        target_number: TransactionNumber,
    ) -> Result<(), Error> {
        let (envelope, drawn) = {
            let mut wallet = self.wallet.lock().unwrap();
            cancel_cron::cancel_cron_item(&self.numbers, &self.requests, &mut wallet, nym_id, server_id, target_number)?
        };
        let reply = self.send(nym_id, server_id, envelope, &drawn).await?;
        self.harvest_on_failure(nym_id, server_id, &drawn, reply.body.outcome);
        if reply.body.outcome != ReplyOutcome::Success {
            return Err(Error::ReplyFailure(
                reply.body.detail.unwrap_or_else(|| "cancelCronItem rejected".into()),
            ));
        }
        Ok(())
    }

    // ── §4.5 reconciliation ───────────────────────────────────────────

    /// Process a freshly fetched nymbox: match reply notices against the
    /// sent outbuffer, then flush and classify everything left (§4.5).
    pub fn process_nymbox(&self, nym_id: &NymId, server_id: &ServerId, nymbox: &Ledger) -> Vec<ReconcileOutcome> {
        outpayments::reconcile(&self.numbers, &self.outbuffer, nym_id, server_id, nymbox)
            .into_iter()
            .map(|(_, outcome)| outcome)
            .collect()
    }

    // ── §4.4 record_payment ───────────────────────────────────────────

    /// Decide and apply `record_payment` for the outpayment entry at
    /// `index` (§4.4). `related_receipt_present` must be computed by the
    /// caller by walking the relevant asset account inbox/inboxes — for
    /// smart contracts, every account of every party the local Nym has
    /// signing authority over.
    pub fn record_outgoing_payment(
        &self,
        nym_id: &NymId,
        server_id: &ServerId,
        index: usize,
        related_receipt_present: bool,
    ) -> Result<(), Error> {
        let mut wallet = self.wallet.lock().unwrap();
        let now = self.now();
        let nym = wallet.nym(nym_id)?;
        let entry = nym
            .outpayments
            .get(index)
            .ok_or_else(|| Error::NotFound("outpayment index out of range".into()))?;
        let opening = entry.instrument.opening_number_for(nym_id);
        let is_issued = opening.map(|n| self.numbers.is_issued(nym_id, server_id, n)).unwrap_or(false);
        let is_tentative = opening.map(|n| self.numbers.is_tentative(nym_id, server_id, n)).unwrap_or(false);

        let decision = record_engine::decide(&RecordDecisionInput {
            my_nym: nym_id,
            server: server_id,
            instrument: &entry.instrument,
            source: SourceBox::Outpayments,
            now,
            is_issued,
            is_tentative,
            related_receipt_present,
        });

        let nym = wallet.nym_mut(nym_id)?;
        let outpayments = &mut nym.outpayments;
        let mut boxes = RecordBoxes { record_box: &mut nym.record_box, expired_box: &mut nym.expired_box };
        record_engine::apply_outpayment(&self.numbers, nym_id, server_id, outpayments, index, &mut boxes, decision)
    }

    /// Same as [`Client::record_outgoing_payment`] but for an entry in the
    /// payment inbox (incoming, never harvests — §4.4 step 2).
    pub fn record_incoming_payment(&self, nym_id: &NymId, index: usize) -> Result<(), Error> {
        let mut wallet = self.wallet.lock().unwrap();
        let now = self.now();
        let nym = wallet.nym(nym_id)?;
        let entry = nym
            .payment_inbox
            .get(index)
            .ok_or_else(|| Error::NotFound("payment inbox index out of range".into()))?;

        let decision = record_engine::decide(&RecordDecisionInput {
            my_nym: nym_id,
            server: &entry.instrument.server().clone(),
            instrument: &entry.instrument,
            source: SourceBox::PaymentInbox,
            now,
            is_issued: false,
            is_tentative: false,
            related_receipt_present: false,
        });

        let nym = wallet.nym_mut(nym_id)?;
        let payment_inbox = &mut nym.payment_inbox;
        let mut boxes = RecordBoxes { record_box: &mut nym.record_box, expired_box: &mut nym.expired_box };
        record_engine::apply_payment_inbox(payment_inbox, index, &mut boxes, decision)
    }

    /// `clear_record` / `clear_expired`: drop every entry in the named box
    /// that is no longer needed — i.e. every entry already written there
    /// by `record_payment`. The record/expired boxes are purely local
    /// archives (§3), so clearing them is just truncation.
    pub fn clear_record(&self, nym_id: &NymId) -> Result<usize, Error> {
        let mut wallet = self.wallet.lock().unwrap();
        let nym = wallet.nym_mut(nym_id)?;
        let count = nym.record_box.entries().len();
        nym.record_box = Ledger::new();
        Ok(count)
    }

    pub fn clear_expired(&self, nym_id: &NymId) -> Result<usize, Error> {
        let mut wallet = self.wallet.lock().unwrap();
        let nym = wallet.nym_mut(nym_id)?;
        let count = nym.expired_box.entries().len();
        nym.expired_box = Ledger::new();
        Ok(count)
    }

    pub fn incoming_payments(&self, nym_id: &NymId) -> Result<Vec<IncomingPaymentEntry>, Error> {
        Ok(self.wallet.lock().unwrap().nym(nym_id)?.payment_inbox.clone())
    }

    pub fn outpayments(&self, nym_id: &NymId) -> Result<Vec<OutpaymentEntry>, Error> {
        Ok(self.wallet.lock().unwrap().nym(nym_id)?.outpayments.clone())
    }

    // ── §4.7 password rotation ────────────────────────────────────────

    pub fn rotate_password(&self, current_passphrase: &str, new_passphrase: &str) -> Result<(), Error> {
        let mut wallet = self.wallet.lock().unwrap();
        password_rotation::rotate(&mut wallet, current_passphrase, new_passphrase)?;
        info!("wallet master key rotated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::envelope::{ReplyBody, ReplyOutcome};
    use crate::types::{AssetAccount, AssetId, IncomingEnvelope, Nym};
    use crate::wallet::fs::DataFolder;
    use transport::LoopbackTransport;

    fn always_success() -> Arc<dyn Transport> {
        Arc::new(LoopbackTransport::new(|env| {
            Ok(IncomingEnvelope {
                body: ReplyBody {
                    command: env.body.command.clone(),
                    request_number: env.body.request_number,
                    outcome: ReplyOutcome::Success,
                    new_nymbox_hash: Some("hash-1".into()),
                    detail: None,
                },
                signature: vec![],
            })
        }))
    }

    fn client_with_funded_account() -> (Client, NymId, ServerId, AccountId) {
        let client = Client::open(DataFolder::new("/tmp/notary-client-test"), "pw", always_success());
        let (nym_id, server_id, account_id) = {
            let mut wallet = client.wallet();
            let nym = Nym::generate(Some("alice".into()));
            let nym_id = nym.id().clone();
            wallet.insert_nym(nym).unwrap();
            let server_id = ServerId::from("srv1");
            let account_id = AccountId::from("acct-1");
            let mut account =
                AssetAccount::new(account_id.clone(), nym_id.clone(), AssetId::from("usd"), server_id.clone());
            account.apply_delta(500);
            wallet.insert_account(account).unwrap();
            (nym_id, server_id, account_id)
        };
        client.numbers().seed_available(&nym_id, &server_id, vec![TransactionNumber(101), TransactionNumber(102)]);
        (client, nym_id, server_id, account_id)
    }

    // §8 scenario 1: cheque happy path.
    #[tokio::test]
    async fn write_cheque_happy_path_files_an_outpayment() {
        let (client, nym_id, server_id, account_id) = client_with_funded_account();

        let cheque = client
            .write_cheque(
                &nym_id,
                &server_id,
                &account_id,
                100,
                ValidityWindow::new(0, 1_000),
                None,
            )
            .unwrap();

        assert_eq!(cheque.amount, 100);
        assert_eq!(client.outpayments(&nym_id).unwrap().len(), 1);
        assert!(client.numbers().is_issued(&nym_id, &server_id, cheque.transaction_number));
    }

    #[tokio::test]
    async fn record_payment_harvests_an_expired_unused_cheque() {
        let (client, nym_id, server_id, account_id) = client_with_funded_account();
        let cheque = client
            .write_cheque(&nym_id, &server_id, &account_id, 100, ValidityWindow::new(0, 1_000), None)
            .unwrap();
        let tx_number = cheque.transaction_number;

        let client = client.with_clock(Arc::new(crate::clock::FixedClock(2_000)));
        client.record_outgoing_payment(&nym_id, &server_id, 0, false).unwrap();

        assert!(client.outpayments(&nym_id).unwrap().is_empty());
        assert!(!client.numbers().is_issued(&nym_id, &server_id, tx_number));
        assert_eq!(client.numbers().available_count(&nym_id, &server_id), 1);
    }
}

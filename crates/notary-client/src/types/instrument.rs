//! Payment instruments.
//!
//! `PaymentInstrument` is the tagged sum prescribed by spec §9 Design Notes,
//! replacing the deep `Contract ← Scriptable ← Instrument ← Trackable`
//! inheritance chain of `original_source`. Field layout for the money
//! instruments mirrors `original_source/include/opentxs/ext/OTPayment.hpp`
//! (sender/recipient/remitter Nym+account IDs, valid-from/valid-to,
//! transaction number, memo) rather than being invented from scratch.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::ids::{AccountId, AssetId, NymId, ServerId, TransactionNumber};

/// `now ∈ [valid_from, valid_to]` is the instrument's validity invariant (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub valid_from: i64,
    pub valid_to: i64,
}

impl ValidityWindow {
    pub fn new(valid_from: i64, valid_to: i64) -> Self {
        Self { valid_from, valid_to }
    }

    pub fn contains(&self, now: i64) -> bool {
        now >= self.valid_from && now <= self.valid_to
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.valid_to
    }

    pub fn is_not_yet_valid(&self, now: i64) -> bool {
        now < self.valid_from
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstrumentCommon {
    pub asset: AssetId,
    pub server: ServerId,
    pub validity: ValidityWindow,
    pub memo: Option<String>,
}

/// A cheque (or, with a negative `amount`, an invoice — §4.3: "negative
/// cheque amount means invoice").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cheque {
    pub common: InstrumentCommon,
    pub sender_acct: AccountId,
    pub sender_nym: NymId,
    pub recipient_nym: Option<NymId>,
    pub recipient_acct: Option<AccountId>,
    pub transaction_number: TransactionNumber,
    pub amount: i64,
}

impl Cheque {
    pub fn new(
        common: InstrumentCommon,
        sender_acct: AccountId,
        sender_nym: NymId,
        transaction_number: TransactionNumber,
        amount: i64,
    ) -> Result<Self, Error> {
        if amount == 0 {
            return Err(Error::InvalidInput("cheque amount must be non-zero".into()));
        }
        Ok(Self {
            common,
            sender_acct,
            sender_nym,
            recipient_nym: None,
            recipient_acct: None,
            transaction_number,
            amount,
        })
    }

    /// An invoice is a cheque with a negative amount (§4.3).
    pub fn is_invoice(&self) -> bool {
        self.amount < 0
    }
}

/// A voucher: a cashier's-cheque-like instrument drawn on the server's own
/// reserve account. The `remitter_*` fields identify the party on whose
/// behalf the voucher was purchased — see the open question in §9: this
/// crate rejects vouchers that set them (no `voucherReceipt` state machine
/// exists on the remitter's inbox yet) rather than silently storing them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Voucher {
    pub common: InstrumentCommon,
    pub sender_acct: AccountId,
    pub sender_nym: NymId,
    pub remitter_nym: Option<NymId>,
    pub remitter_acct: Option<AccountId>,
    pub recipient_nym: Option<NymId>,
    pub transaction_number: TransactionNumber,
    pub amount: i64,
}

impl Voucher {
    pub fn new(
        common: InstrumentCommon,
        sender_acct: AccountId,
        sender_nym: NymId,
        transaction_number: TransactionNumber,
        amount: i64,
    ) -> Result<Self, Error> {
        if amount <= 0 {
            return Err(Error::InvalidInput("voucher amount must be positive".into()));
        }
        Ok(Self {
            common,
            sender_acct,
            sender_nym,
            remitter_nym: None,
            remitter_acct: None,
            recipient_nym: None,
            transaction_number,
            amount,
        })
    }

    /// Attach a remitter. Rejected pending a remitter receipt state
    /// machine — see module docs and spec §9's open question.
    pub fn with_remitter(self, _remitter_nym: NymId, _remitter_acct: AccountId) -> Result<Self, Error> {
        Err(Error::InvalidInput(
            "vouchers with a remitter are not supported: no voucherReceipt state machine \
             exists yet to give the remitter provable notice"
                .into(),
        ))
    }
}

/// A payment plan. Created by the recipient (merchant), who draws two
/// numbers (opening+closing) before transmitting it to the payer; the payer
/// confirms by attaching two of their own (§4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub common: InstrumentCommon,
    pub merchant_nym: NymId,
    pub merchant_acct: AccountId,
    pub merchant_opening: TransactionNumber,
    pub merchant_closing: TransactionNumber,
    pub payer_nym: Option<NymId>,
    pub payer_acct: Option<AccountId>,
    pub payer_opening: Option<TransactionNumber>,
    pub payer_closing: Option<TransactionNumber>,
    pub canceled: bool,
}

impl PaymentPlan {
    pub fn propose(
        common: InstrumentCommon,
        merchant_nym: NymId,
        merchant_acct: AccountId,
        merchant_opening: TransactionNumber,
        merchant_closing: TransactionNumber,
    ) -> Self {
        Self {
            common,
            merchant_nym,
            merchant_acct,
            merchant_opening,
            merchant_closing,
            payer_nym: None,
            payer_acct: None,
            payer_opening: None,
            payer_closing: None,
            canceled: false,
        }
    }

    pub fn confirm(
        &mut self,
        payer_nym: NymId,
        payer_acct: AccountId,
        payer_opening: TransactionNumber,
        payer_closing: TransactionNumber,
    ) -> Result<(), Error> {
        if self.payer_nym.is_some() {
            return Err(Error::Conflict("payment plan already confirmed by a payer".into()));
        }
        self.payer_nym = Some(payer_nym);
        self.payer_acct = Some(payer_acct);
        self.payer_opening = Some(payer_opening);
        self.payer_closing = Some(payer_closing);
        Ok(())
    }

    pub fn is_confirmed(&self) -> bool {
        self.payer_nym.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmartContractParty {
    pub id: PartyId,
    pub nym: NymId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmartContractAccount {
    pub account_id: AccountId,
    pub owning_party: PartyId,
    pub asset: AssetId,
}

/// Minimal script authoring surface. The scripting language itself is out
/// of scope (spec §1) — this models only the structural data the CLI's
/// `smart_contract_add_*` operations attach, not execution semantics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptProgram {
    pub bylaws: Vec<String>,
    pub clauses: Vec<(String, String)>,
    pub variables: Vec<(String, String)>,
    pub hooks: Vec<(String, String)>,
    pub callbacks: Vec<(String, String)>,
}

/// A smart contract with N confirming parties (§4.8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmartContract {
    pub common: InstrumentCommon,
    pub parties: Vec<SmartContractParty>,
    pub accounts: Vec<SmartContractAccount>,
    pub script: ScriptProgram,
    pub confirmed: Vec<PartyId>,
    pub activator: Option<PartyId>,
    pub activator_opening: Option<TransactionNumber>,
    pub activator_closing: Option<TransactionNumber>,
    pub canceled: bool,
}

impl SmartContract {
    pub fn new(common: InstrumentCommon) -> Self {
        Self {
            common,
            parties: Vec::new(),
            accounts: Vec::new(),
            script: ScriptProgram::default(),
            confirmed: Vec::new(),
            activator: None,
            activator_opening: None,
            activator_closing: None,
            canceled: false,
        }
    }

    pub fn add_party(&mut self, party: SmartContractParty) -> Result<(), Error> {
        if self.parties.iter().any(|p| p.id == party.id) {
            return Err(Error::AlreadyExists(format!("party {} already added", party.id.0)));
        }
        self.parties.push(party);
        Ok(())
    }

    pub fn add_account(&mut self, account: SmartContractAccount) -> Result<(), Error> {
        if self.accounts.iter().any(|a| a.account_id == account.account_id) {
            return Err(Error::AlreadyExists(format!(
                "account {} already attached",
                account.account_id
            )));
        }
        self.accounts.push(account);
        Ok(())
    }

    pub fn confirm_party(&mut self, party: PartyId) -> Result<(), Error> {
        if !self.parties.iter().any(|p| p.id == party) {
            return Err(Error::NotFound(format!("party {} not found", party.0)));
        }
        if !self.confirmed.contains(&party) {
            self.confirmed.push(party);
        }
        Ok(())
    }

    pub fn all_confirmed(&self) -> bool {
        !self.parties.is_empty()
            && self.parties.iter().all(|p| self.confirmed.contains(&p.id))
    }
}

/// The tagged sum of every payment instrument kind (§9 Design Notes).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PaymentInstrument {
    Cheque(Cheque),
    Invoice(Cheque),
    Voucher(Voucher),
    PaymentPlan(PaymentPlan),
    SmartContract(SmartContract),
    Notice { common: InstrumentCommon, message: String },
}

impl PaymentInstrument {
    pub fn validity(&self) -> &ValidityWindow {
        match self {
            PaymentInstrument::Cheque(c) | PaymentInstrument::Invoice(c) => &c.common.validity,
            PaymentInstrument::Voucher(v) => &v.common.validity,
            PaymentInstrument::PaymentPlan(p) => &p.common.validity,
            PaymentInstrument::SmartContract(s) => &s.common.validity,
            PaymentInstrument::Notice { common, .. } => &common.validity,
        }
    }

    pub fn server(&self) -> &ServerId {
        match self {
            PaymentInstrument::Cheque(c) | PaymentInstrument::Invoice(c) => &c.common.server,
            PaymentInstrument::Voucher(v) => &v.common.server,
            PaymentInstrument::PaymentPlan(p) => &p.common.server,
            PaymentInstrument::SmartContract(s) => &s.common.server,
            PaymentInstrument::Notice { common, .. } => &common.server,
        }
    }

    /// The transaction number this instrument carries, if `my_nym` is the
    /// "sender" party on it (§4.4 steps 3–4). `None` means `my_nym` is not
    /// the sender, or the instrument has no single primary number.
    pub fn opening_number_for(&self, my_nym: &NymId) -> Option<TransactionNumber> {
        match self {
            PaymentInstrument::Cheque(c) | PaymentInstrument::Invoice(c) => {
                (&c.sender_nym == my_nym).then_some(c.transaction_number)
            }
            PaymentInstrument::Voucher(v) => {
                let sender = v.remitter_nym.as_ref().unwrap_or(&v.sender_nym);
                (sender == my_nym).then_some(v.transaction_number)
            }
            PaymentInstrument::PaymentPlan(p) => {
                if &p.merchant_nym == my_nym {
                    Some(p.merchant_opening)
                } else if p.payer_nym.as_ref() == Some(my_nym) {
                    p.payer_opening
                } else {
                    None
                }
            }
            PaymentInstrument::SmartContract(s) => {
                let is_activator = s
                    .activator
                    .as_ref()
                    .and_then(|pid| s.parties.iter().find(|p| &p.id == pid))
                    .map(|p| &p.nym == my_nym)
                    .unwrap_or(false);
                if is_activator { s.activator_opening } else { None }
            }
            PaymentInstrument::Notice { .. } => None,
        }
    }

    /// Every transaction number to harvest when `my_nym` is the sender and
    /// the instrument is abandoned unused (opening + any closing numbers).
    pub fn numbers_to_harvest_for(&self, my_nym: &NymId) -> Vec<TransactionNumber> {
        match self {
            PaymentInstrument::PaymentPlan(p) if &p.merchant_nym == my_nym => {
                vec![p.merchant_opening, p.merchant_closing]
            }
            PaymentInstrument::PaymentPlan(p) if p.payer_nym.as_ref() == Some(my_nym) => {
                [p.payer_opening, p.payer_closing].into_iter().flatten().collect()
            }
            PaymentInstrument::SmartContract(s) => {
                let is_activator = s
                    .activator
                    .as_ref()
                    .and_then(|pid| s.parties.iter().find(|p| &p.id == pid))
                    .map(|p| &p.nym == my_nym)
                    .unwrap_or(false);
                if is_activator {
                    [s.activator_opening, s.activator_closing].into_iter().flatten().collect()
                } else {
                    Vec::new()
                }
            }
            other => other.opening_number_for(my_nym).into_iter().collect(),
        }
    }

    pub fn is_voucher(&self) -> bool {
        matches!(self, PaymentInstrument::Voucher(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common() -> InstrumentCommon {
        InstrumentCommon {
            asset: AssetId::from("usd"),
            server: ServerId::from("srv1"),
            validity: ValidityWindow::new(0, 1_000),
            memo: None,
        }
    }

    #[test]
    fn invoice_is_a_negative_cheque() {
        let cheque = Cheque::new(
            common(),
            AccountId::from("acct-a"),
            NymId::from("alice"),
            TransactionNumber(101),
            -500,
        )
        .unwrap();
        assert!(cheque.is_invoice());
    }

    #[test]
    fn zero_amount_cheque_rejected() {
        assert!(Cheque::new(
            common(),
            AccountId::from("acct-a"),
            NymId::from("alice"),
            TransactionNumber(101),
            0,
        )
        .is_err());
    }

    #[test]
    fn voucher_with_remitter_is_rejected() {
        let voucher = Voucher::new(
            common(),
            AccountId::from("acct-a"),
            NymId::from("alice"),
            TransactionNumber(101),
            500,
        )
        .unwrap();
        assert!(voucher
            .with_remitter(NymId::from("carol"), AccountId::from("acct-c"))
            .is_err());
    }

    #[test]
    fn opening_number_for_cheque_sender() {
        let cheque = Cheque::new(
            common(),
            AccountId::from("acct-a"),
            NymId::from("alice"),
            TransactionNumber(101),
            500,
        )
        .unwrap();
        let instrument = PaymentInstrument::Cheque(cheque);
        assert_eq!(
            instrument.opening_number_for(&NymId::from("alice")),
            Some(TransactionNumber(101))
        );
        assert_eq!(instrument.opening_number_for(&NymId::from("bob")), None);
    }

    #[test]
    fn smart_contract_requires_all_parties_confirmed() {
        let mut sc = SmartContract::new(common());
        sc.add_party(SmartContractParty { id: PartyId("p1".into()), nym: NymId::from("alice") })
            .unwrap();
        sc.add_party(SmartContractParty { id: PartyId("p2".into()), nym: NymId::from("bob") })
            .unwrap();
        assert!(!sc.all_confirmed());
        sc.confirm_party(PartyId("p1".into())).unwrap();
        assert!(!sc.all_confirmed());
        sc.confirm_party(PartyId("p2".into())).unwrap();
        assert!(sc.all_confirmed());
    }
}

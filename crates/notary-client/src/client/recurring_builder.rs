//! Payment plans and smart contracts (§4.8).
//!
//! Payment plans: the recipient (merchant) draws two numbers (opening +
//! closing) and proposes; the payer confirms by drawing two of their own.
//! Either side may cancel before activation by submitting the instrument
//! with the canceler marker set, which simply harvests their own numbers
//! back.
//!
//! Smart contracts: N parties confirm in turn; the final activator must
//! additionally be the authorizing agent for at least one party **and**
//! the authorized agent for at least one attached asset account of that
//! party, and supplies the cron opening/closing pair from their own
//! account.

use crate::client::number_manager::NumberManager;
use crate::error::Error;
use crate::types::ids::{AccountId, NymId, ServerId};
use crate::types::instrument::{InstrumentCommon, PartyId, PaymentPlan, SmartContract};

/// Draw the merchant's opening+closing pair and propose a payment plan.
pub fn propose_payment_plan(
    numbers: &NumberManager,
    merchant_nym: &NymId,
    server: &ServerId,
    merchant_acct: AccountId,
    common: InstrumentCommon,
) -> Result<PaymentPlan, Error> {
    let drawn = numbers.draw_many(merchant_nym, server, 2)?;
    numbers.confirm_tentative(merchant_nym, server, &drawn);
    Ok(PaymentPlan::propose(common, merchant_nym.clone(), merchant_acct, drawn[0], drawn[1]))
}

/// Draw the payer's opening+closing pair and confirm a proposed plan. On
/// any failure the payer's drawn numbers are returned unharvested.
pub fn confirm_payment_plan(
    numbers: &NumberManager,
    plan: &mut PaymentPlan,
    payer_nym: &NymId,
    server: &ServerId,
    payer_acct: AccountId,
) -> Result<(), Error> {
    let drawn = numbers.draw_many(payer_nym, server, 2)?;
    match plan.confirm(payer_nym.clone(), payer_acct, drawn[0], drawn[1]) {
        Ok(()) => {
            numbers.confirm_tentative(payer_nym, server, &drawn);
            Ok(())
        }
        Err(e) => {
            for n in drawn {
                numbers.return_unused(payer_nym, server, n);
            }
            Err(e)
        }
    }
}

/// Cancel a plan before activation: submit with the canceler marker set,
/// harvesting the canceling party's own opening+closing numbers.
pub fn cancel_payment_plan(
    numbers: &NumberManager,
    plan: &mut PaymentPlan,
    canceler: &NymId,
    server: &ServerId,
) -> Result<(), Error> {
    if plan.is_confirmed() {
        return Err(Error::Conflict("payment plan already activated; use cancel_cron_item instead".into()));
    }
    if &plan.merchant_nym != canceler {
        return Err(Error::Unauthorized("only the merchant may cancel an unconfirmed plan".into()));
    }
    plan.canceled = true;
    numbers.return_unused(canceler, server, plan.merchant_opening);
    numbers.return_unused(canceler, server, plan.merchant_closing);
    Ok(())
}

/// Draw the activator's cron opening+closing pair and activate a smart
/// contract, after verifying every §4.8 activation precondition.
pub fn activate_smart_contract(
    numbers: &NumberManager,
    contract: &mut SmartContract,
    server: &ServerId,
    activator_party: &PartyId,
    activator_nym: &NymId,
) -> Result<(), Error> {
    if contract.common.server != *server {
        return Err(Error::InvalidInput("server ID does not match the contract".into()));
    }
    if !contract.all_confirmed() {
        return Err(Error::Conflict("not every party has confirmed".into()));
    }
    let party = contract
        .parties
        .iter()
        .find(|p| &p.id == activator_party)
        .ok_or_else(|| Error::NotFound(format!("party {} not found", activator_party.0)))?;
    if &party.nym != activator_nym {
        return Err(Error::Unauthorized(
            "activator is not the authorizing agent for this party".into(),
        ));
    }
    if !contract.accounts.iter().any(|a| &a.owning_party == activator_party) {
        return Err(Error::Unauthorized(
            "activator has no attached asset account for this party".into(),
        ));
    }

    let drawn = numbers.draw_many(activator_nym, server, 2)?;
    contract.activator = Some(activator_party.clone());
    contract.activator_opening = Some(drawn[0]);
    contract.activator_closing = Some(drawn[1]);
    numbers.confirm_tentative(activator_nym, server, &drawn);
    Ok(())
}

//! Outpayments queue and the sent-outbuffer reconciliation pass (§4.5).
//!
//! After a successful nymbox fetch, every reply-notice receipt in the
//! nymbox is matched against the sent outbuffer and removed with no
//! harvest (the reply was delivered through the nymbox). The remaining
//! sent entries are then flushed: message-level failures harvest every
//! attached number, transaction-level failures burn the primary number but
//! harvest auxiliary closing numbers, and entries with no reply yet are
//! left for the next cycle. This is the only subsystem allowed to burn
//! opening numbers without a corresponding server receipt.

use crate::client::number_manager::NumberManager;
use crate::client::sent_outbuffer::{SentEntry, SentOutbuffer};
use crate::types::envelope::ReplyOutcome;
use crate::types::ids::{NymId, RequestNumber, ServerId};
use crate::types::ledger::{Ledger, TransactionType};

/// Outcome of reconciling one sent entry, surfaced for logging/tests.
#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Delivered via a nymbox reply notice; no harvest performed.
    DeliveredViaNymbox,
    /// Message-level failure: every attached number harvested.
    HarvestedAll,
    /// Transaction-level failure: primary burned, auxiliary harvested.
    BurnedPrimaryHarvestedAuxiliary,
    /// No reply yet; left in the buffer for the next cycle.
    AwaitingReply,
}

/// Process every reply-notice receipt in `nymbox`, removing matching sent
/// entries with no harvest, then flush and classify everything left.
pub fn reconcile(
    numbers: &NumberManager,
    outbuffer: &SentOutbuffer,
    nym: &NymId,
    server: &ServerId,
    nymbox: &Ledger,
) -> Vec<(SentEntry, ReconcileOutcome)> {
    let mut results = Vec::new();

    for notice in nymbox.entries().iter().filter(|e| e.tx_type == TransactionType::ReplyNotice) {
        if let Some(request_number) = notice.reference_to_number {
            if let Some(entry) =
                outbuffer.remove_by_request_number(nym, server, RequestNumber(request_number.0))
            {
                results.push((entry, ReconcileOutcome::DeliveredViaNymbox));
            }
        }
    }

    for entry in outbuffer.take_all_for(nym, server) {
        match entry.reply {
            Some(ReplyOutcome::Success) => {
                // Already should have arrived via nymbox above; if it
                // didn't, treat as delivered with no harvest.
                results.push((entry, ReconcileOutcome::DeliveredViaNymbox));
            }
            Some(ReplyOutcome::MessageFailure) => {
                numbers.return_unused(nym, server, entry.primary_number);
                for n in &entry.auxiliary_numbers {
                    numbers.return_unused(nym, server, *n);
                }
                results.push((entry, ReconcileOutcome::HarvestedAll));
            }
            Some(ReplyOutcome::TransactionFailure) => {
                // Primary is burned: leave it in `issued` permanently by
                // simply not returning it (the server consumed it even
                // though the transaction itself failed).
                for n in &entry.auxiliary_numbers {
                    numbers.return_unused(nym, server, *n);
                }
                results.push((entry, ReconcileOutcome::BurnedPrimaryHarvestedAuxiliary));
            }
            None => {
                let awaiting = entry.clone();
                outbuffer.put_back(entry);
                results.push((awaiting, ReconcileOutcome::AwaitingReply));
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::TransactionNumber;
    use crate::types::ledger::LedgerEntry;

    fn ids() -> (NymId, ServerId) {
        (NymId::from("alice"), ServerId::from("srv1"))
    }

    fn sent(req: u64, primary: u64, aux: Vec<u64>, reply: Option<ReplyOutcome>) -> SentEntry {
        let (nym, server) = ids();
        SentEntry {
            request_number: RequestNumber(req),
            nym,
            server,
            primary_number: TransactionNumber(primary),
            auxiliary_numbers: aux.into_iter().map(TransactionNumber).collect(),
            sent_at: 0,
            reply,
        }
    }

    #[test]
    fn reply_notice_in_nymbox_removes_entry_without_harvest() {
        let (nym, server) = ids();
        let numbers = NumberManager::new();
        let outbuffer = SentOutbuffer::new();
        numbers.seed_available(&nym, &server, vec![]);
        outbuffer.track(sent(1, 101, vec![], None));

        let mut nymbox = Ledger::new();
        nymbox.push(LedgerEntry::new(
            TransactionNumber(900),
            TransactionType::ReplyNotice,
            Some(TransactionNumber(1)),
        ));

        let results = reconcile(&numbers, &outbuffer, &nym, &server, &nymbox);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1, ReconcileOutcome::DeliveredViaNymbox);
        assert_eq!(numbers.available_count(&nym, &server), 0);
    }

    #[test]
    fn message_failure_harvests_every_attached_number() {
        let (nym, server) = ids();
        let numbers = NumberManager::new();
        numbers.seed_available(&nym, &server, vec![TransactionNumber(101), TransactionNumber(102)]);
        let drawn = numbers.draw_many(&nym, &server, 2).unwrap();
        numbers.confirm_tentative(&nym, &server, &drawn);

        let outbuffer = SentOutbuffer::new();
        outbuffer.track(sent(1, drawn[0].0, vec![drawn[1].0], Some(ReplyOutcome::MessageFailure)));

        let nymbox = Ledger::new();
        let results = reconcile(&numbers, &outbuffer, &nym, &server, &nymbox);

        assert_eq!(results[0].1, ReconcileOutcome::HarvestedAll);
        assert_eq!(numbers.available_count(&nym, &server), 2);
    }

    #[test]
    fn transaction_failure_burns_primary_but_harvests_auxiliary() {
        let (nym, server) = ids();
        let numbers = NumberManager::new();
        numbers.seed_available(&nym, &server, vec![TransactionNumber(101), TransactionNumber(102)]);
        let drawn = numbers.draw_many(&nym, &server, 2).unwrap();
        numbers.confirm_tentative(&nym, &server, &drawn);

        let outbuffer = SentOutbuffer::new();
        outbuffer.track(sent(1, drawn[0].0, vec![drawn[1].0], Some(ReplyOutcome::TransactionFailure)));

        let nymbox = Ledger::new();
        let results = reconcile(&numbers, &outbuffer, &nym, &server, &nymbox);

        assert_eq!(results[0].1, ReconcileOutcome::BurnedPrimaryHarvestedAuxiliary);
        assert!(numbers.is_issued(&nym, &server, drawn[0]));
        assert!(!numbers.is_issued(&nym, &server, drawn[1]));
        assert_eq!(numbers.available_count(&nym, &server), 1);
    }

    #[test]
    fn no_reply_leaves_entry_in_buffer_with_numbers_still_issued() {
        let (nym, server) = ids();
        let numbers = NumberManager::new();
        numbers.seed_available(&nym, &server, vec![TransactionNumber(101)]);
        let drawn = numbers.draw_many(&nym, &server, 1).unwrap();
        numbers.confirm_tentative(&nym, &server, &drawn);

        let outbuffer = SentOutbuffer::new();
        outbuffer.track(sent(1, drawn[0].0, vec![], None));

        let nymbox = Ledger::new();
        let results = reconcile(&numbers, &outbuffer, &nym, &server, &nymbox);

        assert_eq!(results[0].1, ReconcileOutcome::AwaitingReply);
        assert!(numbers.is_issued(&nym, &server, drawn[0]));
        assert_eq!(outbuffer.entries_for(&nym, &server).len(), 1);
    }
}

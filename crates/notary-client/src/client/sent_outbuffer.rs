//! Tracks sent requests awaiting reply (§2, §4.5).

use std::sync::Mutex;

use crate::types::envelope::ReplyOutcome;
use crate::types::ids::{NymId, RequestNumber, ServerId, TransactionNumber};

/// One dispatched-but-not-yet-reconciled request.
#[derive(Clone, Debug)]
pub struct SentEntry {
    pub request_number: RequestNumber,
    pub nym: NymId,
    pub server: ServerId,
    pub primary_number: TransactionNumber,
    pub auxiliary_numbers: Vec<TransactionNumber>,
    pub sent_at: i64,
    /// Set once a reply is observed for this request number (via the
    /// nymbox or a direct reply envelope). `None` means no reply has
    /// arrived yet — retry policy applies, numbers stay issued (§4.5).
    pub reply: Option<ReplyOutcome>,
}

/// Per-instance buffer of in-flight requests, flushed after a nymbox
/// snapshot (§2).
#[derive(Default)]
pub struct SentOutbuffer {
    entries: Mutex<Vec<SentEntry>>,
}

impl SentOutbuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, entry: SentEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Record a reply outcome against its matching in-flight entry.
    pub fn record_reply(&self, nym: &NymId, server: &ServerId, request_number: RequestNumber, outcome: ReplyOutcome) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| &e.nym == nym && &e.server == server && e.request_number == request_number)
        {
            entry.reply = Some(outcome);
        }
    }

    pub fn remove_by_request_number(
        &self,
        nym: &NymId,
        server: &ServerId,
        request_number: RequestNumber,
    ) -> Option<SentEntry> {
        let mut entries = self.entries.lock().unwrap();
        let idx = entries
            .iter()
            .position(|e| &e.nym == nym && &e.server == server && e.request_number == request_number)?;
        Some(entries.remove(idx))
    }

    /// Snapshot of everything currently tracked for (nym, server).
    pub fn entries_for(&self, nym: &NymId, server: &ServerId) -> Vec<SentEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.nym == nym && &e.server == server)
            .cloned()
            .collect()
    }

    /// Drain every entry for (nym, server) — used by the flush step of
    /// reconciliation (§4.5).
    pub fn take_all_for(&self, nym: &NymId, server: &ServerId) -> Vec<SentEntry> {
        let mut entries = self.entries.lock().unwrap();
        let (taken, kept): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|e| &e.nym == nym && &e.server == server);
        *entries = kept;
        taken
    }

    pub fn put_back(&self, entry: SentEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(req: u64) -> SentEntry {
        SentEntry {
            request_number: RequestNumber(req),
            nym: NymId::from("alice"),
            server: ServerId::from("srv1"),
            primary_number: TransactionNumber(100 + req),
            auxiliary_numbers: vec![],
            sent_at: 0,
            reply: None,
        }
    }

    #[test]
    fn take_all_for_drains_only_matching_nym_server() {
        let buf = SentOutbuffer::new();
        buf.track(entry(1));
        buf.track(SentEntry { nym: NymId::from("bob"), ..entry(2) });

        let taken = buf.take_all_for(&NymId::from("alice"), &ServerId::from("srv1"));
        assert_eq!(taken.len(), 1);
        assert_eq!(buf.entries_for(&NymId::from("bob"), &ServerId::from("srv1")).len(), 1);
    }
}

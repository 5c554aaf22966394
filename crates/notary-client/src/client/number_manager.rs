//! Per-Nym, per-server transaction number pools (§4.1).
//!
//! Mirrors the teacher's `NonceManager` shape — a thin manager object
//! guarding a `Mutex<HashMap<...>>` — generalized to three pools
//! (available / issued / tentative) instead of one counter, since a number
//! moves through more states than a nonce does.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::Error;
use crate::types::ids::{NymId, ServerId, TransactionNumber};

/// Low-water marks below which the client must refuse the operation and
/// surface `InsufficientNumbers` (§4.1).
pub const SINGLE_TRANSACTION_MIN: usize = 2;
pub const MARKET_OFFER_MIN: usize = 3;

/// One main-transaction number, one closing number per sub-account, and
/// one closing number for the main account: `basket_count + 2` (§4.1,
/// §4.9 — two sub-accounts requires `1+2+1=4`).
pub fn basket_exchange_min(basket_count: usize) -> usize {
    basket_count + 2
}

#[derive(Default)]
struct Pool {
    available: Vec<TransactionNumber>,
    issued: HashSet<TransactionNumber>,
    tentative: HashSet<TransactionNumber>,
}

/// Draws atomically decrement `available` and append to `issued`; a number
/// is in at most one of {available, tentative} (§3 invariant).
pub struct NumberManager {
    pools: Mutex<HashMap<(NymId, ServerId), Pool>>,
}

impl Default for NumberManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberManager {
    pub fn new() -> Self {
        Self { pools: Mutex::new(HashMap::new()) }
    }

    /// Seed a pool with numbers issued by the server out-of-band (e.g. a
    /// `getTransactionNumbers` reply). Newly seeded numbers start
    /// available, not issued.
    pub fn seed_available(&self, nym: &NymId, server: &ServerId, numbers: Vec<TransactionNumber>) {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry((nym.clone(), server.clone())).or_default();
        pool.available.extend(numbers);
    }

    pub fn available_count(&self, nym: &NymId, server: &ServerId) -> usize {
        self.pools
            .lock()
            .unwrap()
            .get(&(nym.clone(), server.clone()))
            .map(|p| p.available.len())
            .unwrap_or(0)
    }

    pub fn is_issued(&self, nym: &NymId, server: &ServerId, n: TransactionNumber) -> bool {
        self.pools
            .lock()
            .unwrap()
            .get(&(nym.clone(), server.clone()))
            .map(|p| p.issued.contains(&n))
            .unwrap_or(false)
    }

    pub fn is_tentative(&self, nym: &NymId, server: &ServerId, n: TransactionNumber) -> bool {
        self.pools
            .lock()
            .unwrap()
            .get(&(nym.clone(), server.clone()))
            .map(|p| p.tentative.contains(&n))
            .unwrap_or(false)
    }

    /// Draw one number: move it from `available` to `tentative`, refusing
    /// if none are available.
    fn draw_one(pool: &mut Pool) -> Result<TransactionNumber, Error> {
        let n = pool
            .available
            .pop()
            .ok_or_else(|| Error::InsufficientNumbers { needed: 1, available: 0 })?;
        pool.tentative.insert(n);
        Ok(n)
    }

    /// Draw `count` numbers, refusing (and rolling back) if fewer than
    /// `count` are available — the low-water-mark check in §4.1.
    pub fn draw_many(
        &self,
        nym: &NymId,
        server: &ServerId,
        count: usize,
    ) -> Result<Vec<TransactionNumber>, Error> {
        self.draw_many_with_floor(nym, server, count, 0)
    }

    /// Like [`NumberManager::draw_many`], but refuses unless at least
    /// `floor` numbers remain available even when `count` itself is
    /// smaller — the general form of §4.1's low-water mark ("<2 for a
    /// single transaction, <3 for a market offer, ..."), which reserves a
    /// pool floor independent of how many numbers this particular call
    /// actually spends.
    pub fn draw_many_with_floor(
        &self,
        nym: &NymId,
        server: &ServerId,
        count: usize,
        floor: usize,
    ) -> Result<Vec<TransactionNumber>, Error> {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry((nym.clone(), server.clone())).or_default();
        let required = count.max(floor);
        if pool.available.len() < required {
            return Err(Error::InsufficientNumbers { needed: required, available: pool.available.len() });
        }
        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            drawn.push(Self::draw_one(pool).expect("checked availability above"));
        }
        Ok(drawn)
    }

    /// Draw a single number, refusing below [`SINGLE_TRANSACTION_MIN`]
    /// (§4.1) — the low-water mark for single-transaction operations like
    /// [`Client::write_cheque`](crate::Client::write_cheque) that draw
    /// directly instead of going through [`TransactionBuilder`](crate::client::transaction_builder::TransactionBuilder).
    pub fn draw(&self, nym: &NymId, server: &ServerId) -> Result<TransactionNumber, Error> {
        Ok(self.draw_many_with_floor(nym, server, 1, SINGLE_TRANSACTION_MIN)?[0])
    }

    /// Confirm tentative numbers as issued once a request carrying them has
    /// actually been dispatched.
    pub fn confirm_tentative(&self, nym: &NymId, server: &ServerId, numbers: &[TransactionNumber]) {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry((nym.clone(), server.clone())).or_default();
        for n in numbers {
            pool.tentative.remove(n);
            pool.issued.insert(*n);
        }
    }

    /// Mark numbers issued directly (skipping the tentative stage), used
    /// when a server reply confirms numbers as committed in one step.
    pub fn mark_issued(&self, nym: &NymId, server: &ServerId, numbers: &[TransactionNumber]) {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry((nym.clone(), server.clone())).or_default();
        for n in numbers {
            pool.tentative.remove(n);
            pool.issued.insert(*n);
        }
    }

    /// The harvest path: re-add to `available` only if the number is still
    /// in `issued`, otherwise a silent no-op (§4.1 — "the number has
    /// already been validly consumed").
    pub fn return_unused(&self, nym: &NymId, server: &ServerId, n: TransactionNumber) {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry((nym.clone(), server.clone())).or_default();
        if pool.issued.remove(&n) {
            pool.available.push(n);
        }
        // Also release a still-tentative number drawn but never confirmed
        // (e.g. construction failed before the request was sent).
        if pool.tentative.remove(&n) {
            pool.available.push(n);
        }
    }

    /// Close a number out of `issued` entirely — the server processed a
    /// matching closeout receipt, so the number is gone for good and must
    /// NOT return to `available`.
    pub fn close(&self, nym: &NymId, server: &ServerId, n: TransactionNumber) {
        let mut pools = self.pools.lock().unwrap();
        if let Some(pool) = pools.get_mut(&(nym.clone(), server.clone())) {
            pool.issued.remove(&n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (NymId, ServerId) {
        (NymId::from("alice"), ServerId::from("srv1"))
    }

    #[test]
    fn draw_many_refuses_below_low_water_mark() {
        let (nym, server) = ids();
        let mgr = NumberManager::new();
        mgr.seed_available(&nym, &server, vec![TransactionNumber(1), TransactionNumber(2), TransactionNumber(3)]);

        assert!(mgr.draw_many(&nym, &server, 4).is_err());
        // Failed draw must not have consumed any numbers.
        assert_eq!(mgr.available_count(&nym, &server), 3);
    }

    #[test]
    fn return_unused_is_noop_if_not_issued() {
        let (nym, server) = ids();
        let mgr = NumberManager::new();
        mgr.seed_available(&nym, &server, vec![TransactionNumber(101), TransactionNumber(102)]);
        let n = mgr.draw(&nym, &server).unwrap();
        mgr.confirm_tentative(&nym, &server, &[n]);
        mgr.close(&nym, &server, n); // number consumed for good

        mgr.return_unused(&nym, &server, n);
        assert_eq!(mgr.available_count(&nym, &server), 1);
        assert!(!mgr.is_issued(&nym, &server, n));
    }

    #[test]
    fn return_unused_harvests_a_still_issued_number() {
        let (nym, server) = ids();
        let mgr = NumberManager::new();
        mgr.seed_available(&nym, &server, vec![TransactionNumber(101), TransactionNumber(102)]);
        let n = mgr.draw(&nym, &server).unwrap();
        mgr.confirm_tentative(&nym, &server, &[n]);
        assert!(mgr.is_issued(&nym, &server, n));

        mgr.return_unused(&nym, &server, n);
        assert!(!mgr.is_issued(&nym, &server, n));
        assert_eq!(mgr.available_count(&nym, &server), 2);
    }

    #[test]
    fn draw_refuses_below_single_transaction_low_water_mark() {
        let (nym, server) = ids();
        let mgr = NumberManager::new();
        mgr.seed_available(&nym, &server, vec![TransactionNumber(101)]);

        assert!(matches!(mgr.draw(&nym, &server), Err(Error::InsufficientNumbers { .. })));
        assert_eq!(mgr.available_count(&nym, &server), 1);
    }

    #[test]
    fn basket_exchange_low_water_mark_matches_formula() {
        assert_eq!(basket_exchange_min(2), 4);
        assert_eq!(basket_exchange_min(0), 2);
    }
}

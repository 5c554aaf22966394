//! Asset accounts: (owner Nym, asset, server, balance, inbox, outbox).

use serde::{Deserialize, Serialize};

use crate::types::ids::{AccountId, AssetId, NymId, ServerId};
use crate::types::ledger::Ledger;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetAccount {
    id: AccountId,
    owner: NymId,
    asset: AssetId,
    server: ServerId,
    balance: i64,
    pub inbox: Ledger,
    pub outbox: Ledger,
}

impl AssetAccount {
    pub fn new(id: AccountId, owner: NymId, asset: AssetId, server: ServerId) -> Self {
        Self {
            id,
            owner,
            asset,
            server,
            balance: 0,
            inbox: Ledger::new(),
            outbox: Ledger::new(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn owner(&self) -> &NymId {
        &self.owner
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn apply_delta(&mut self, delta: i64) {
        self.balance += delta;
    }

    /// Removable only when balance is zero and both boxes are empty (§3).
    pub fn is_removable(&self) -> bool {
        self.balance == 0 && self.inbox.entries().is_empty() && self.outbox.entries().is_empty()
    }
}

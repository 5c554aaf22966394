//! In-memory registry of Nyms, server contracts, asset contracts, and asset
//! accounts; the persistence root (§2, §3).

pub mod config;
pub mod export;
pub mod fs;
pub mod master_key;

use std::collections::HashMap;

use crate::error::Error;
use crate::types::{AssetAccount, AssetContract, AssetId, NymId, Nym, ServerContract, ServerId};
use crate::types::ids::AccountId;
use fs::DataFolder;
use master_key::{MasterKey, MasterKeyMaterial};

pub struct Wallet {
    data_folder: DataFolder,
    master_key: MasterKey,
    nyms: HashMap<NymId, Nym>,
    servers: HashMap<ServerId, ServerContract>,
    assets: HashMap<AssetId, AssetContract>,
    accounts: HashMap<AccountId, AssetAccount>,
}

impl Wallet {
    pub fn new(data_folder: DataFolder, passphrase: &str) -> Self {
        let master_key = MasterKey::new(MasterKeyMaterial::derive(passphrase, b"notary-wallet-salt"));
        Self {
            data_folder,
            master_key,
            nyms: HashMap::new(),
            servers: HashMap::new(),
            assets: HashMap::new(),
            accounts: HashMap::new(),
        }
    }

    pub fn data_folder(&self) -> &DataFolder {
        &self.data_folder
    }

    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    pub fn master_key_mut(&mut self) -> &mut MasterKey {
        &mut self.master_key
    }

    // ── Nyms ──────────────────────────────────────────────────────────

    pub fn insert_nym(&mut self, nym: Nym) -> Result<(), Error> {
        if self.nyms.contains_key(nym.id()) {
            return Err(Error::AlreadyExists(format!("nym {} already in wallet", nym.id())));
        }
        self.nyms.insert(nym.id().clone(), nym);
        Ok(())
    }

    pub fn nym(&self, id: &NymId) -> Result<&Nym, Error> {
        self.nyms.get(id).ok_or_else(|| Error::NotFound(format!("nym {id}")))
    }

    pub fn nym_mut(&mut self, id: &NymId) -> Result<&mut Nym, Error> {
        self.nyms.get_mut(id).ok_or_else(|| Error::NotFound(format!("nym {id}")))
    }

    pub fn nyms(&self) -> impl Iterator<Item = &Nym> {
        self.nyms.values()
    }

    /// Removable only after no asset account references it and no server
    /// lists it as registered (§3). Server registration is out of this
    /// crate's scope (it's server-side state), so only the local account
    /// check applies here.
    pub fn remove_nym(&mut self, id: &NymId) -> Result<(), Error> {
        if self.accounts.values().any(|a| a.owner() == id) {
            return Err(Error::Conflict(format!("nym {id} still owns an asset account")));
        }
        self.nyms
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("nym {id}")))
    }

    // ── Servers ───────────────────────────────────────────────────────

    pub fn insert_server(&mut self, contract: ServerContract) -> Result<(), Error> {
        if self.servers.contains_key(contract.id()) {
            return Err(Error::AlreadyExists(format!("server {} already in wallet", contract.id())));
        }
        self.servers.insert(contract.id().clone(), contract);
        Ok(())
    }

    pub fn server(&self, id: &ServerId) -> Result<&ServerContract, Error> {
        self.servers.get(id).ok_or_else(|| Error::NotFound(format!("server {id}")))
    }

    pub fn remove_server(&mut self, id: &ServerId) -> Result<(), Error> {
        if self.accounts.values().any(|a| a.server() == id) {
            return Err(Error::Conflict(format!("server {id} still holds an asset account")));
        }
        if self.nyms.values().any(|n| n.last_request_number(id).0 > 0) {
            return Err(Error::Conflict(format!("server {id} has a registered Nym")));
        }
        self.servers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("server {id}")))
    }

    // ── Assets ────────────────────────────────────────────────────────

    pub fn insert_asset(&mut self, asset: AssetContract) -> Result<(), Error> {
        if self.assets.contains_key(asset.id()) {
            return Err(Error::AlreadyExists(format!("asset {} already in wallet", asset.id())));
        }
        self.assets.insert(asset.id().clone(), asset);
        Ok(())
    }

    pub fn asset(&self, id: &AssetId) -> Result<&AssetContract, Error> {
        self.assets.get(id).ok_or_else(|| Error::NotFound(format!("asset {id}")))
    }

    pub fn remove_asset(&mut self, id: &AssetId) -> Result<(), Error> {
        if self.accounts.values().any(|a| a.asset() == id) {
            return Err(Error::Conflict(format!("asset {id} is held by an account")));
        }
        self.assets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("asset {id}")))
    }

    // ── Accounts ──────────────────────────────────────────────────────

    pub fn insert_account(&mut self, account: AssetAccount) -> Result<(), Error> {
        if self.accounts.contains_key(account.id()) {
            return Err(Error::AlreadyExists(format!("account {} already in wallet", account.id())));
        }
        self.accounts.insert(account.id().clone(), account);
        Ok(())
    }

    pub fn account(&self, id: &AccountId) -> Result<&AssetAccount, Error> {
        self.accounts.get(id).ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    pub fn account_mut(&mut self, id: &AccountId) -> Result<&mut AssetAccount, Error> {
        self.accounts.get_mut(id).ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    pub fn accounts_for_nym(&self, nym: &NymId) -> impl Iterator<Item = &AssetAccount> {
        self.accounts.values().filter(move |a| a.owner() == nym)
    }

    /// Removable only when balance is zero and both boxes are empty (§3).
    pub fn remove_account(&mut self, id: &AccountId) -> Result<(), Error> {
        let removable = self.account(id)?.is_removable();
        if !removable {
            return Err(Error::Conflict(format!(
                "account {id} has a nonzero balance or a non-empty box"
            )));
        }
        self.accounts.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetAccount, Nym};

    fn wallet() -> Wallet {
        Wallet::new(DataFolder::new("/tmp/notary-test"), "hunter2")
    }

    #[test]
    fn duplicate_nym_insert_is_rejected() {
        let mut w = wallet();
        let nym = Nym::generate(Some("alice".into()));
        w.insert_nym(nym.clone()).unwrap();
        assert!(w.insert_nym(nym).is_err());
    }

    #[test]
    fn cannot_remove_nym_that_owns_an_account() {
        let mut w = wallet();
        let nym = Nym::generate(Some("alice".into()));
        let nym_id = nym.id().clone();
        w.insert_nym(nym).unwrap();
        w.insert_account(AssetAccount::new(
            AccountId::from("acct-1"),
            nym_id.clone(),
            AssetId::from("usd"),
            ServerId::from("srv1"),
        ))
        .unwrap();
        assert!(w.remove_nym(&nym_id).is_err());
    }

    #[test]
    fn empty_account_is_removable() {
        let mut w = wallet();
        let account = AssetAccount::new(
            AccountId::from("acct-1"),
            NymId::from("alice"),
            AssetId::from("usd"),
            ServerId::from("srv1"),
        );
        let id = account.id().clone();
        w.insert_account(account).unwrap();
        assert!(w.remove_account(&id).is_ok());
    }
}

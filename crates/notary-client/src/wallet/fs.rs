//! Filesystem layout under the data folder (§6).
//!
//! Out of scope per §1 are the PID lock file and the concrete wire
//! serialization; this module only lays out the directory structure so the
//! rest of the crate has stable paths to read/write through.

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::ids::{AccountId, NymId, ServerId};
use crate::types::ledger::BoxKind;

/// Root of one wallet's on-disk state.
#[derive(Clone, Debug)]
pub struct DataFolder {
    root: PathBuf,
}

impl DataFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `~/.notary`, matching `wallet/config.rs`'s `WalletSectionConfig`
    /// default of `".notary"` relative to the user's home directory — the
    /// path a fresh wallet uses when no `data_folder` is configured.
    #[cfg(feature = "file-signer")]
    pub fn default_location() -> Result<Self, Error> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".into()))?;
        Ok(Self::new(home.join(".notary")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wallet_file(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.ini")
    }

    /// Per-Nym credential folder: one list file plus one armored file per
    /// credential.
    pub fn credential_folder(&self, nym: &NymId) -> PathBuf {
        self.root.join("credentials").join(&nym.0)
    }

    pub fn credential_list_file(&self, nym: &NymId) -> PathBuf {
        self.credential_folder(nym).join("list")
    }

    /// Legacy per-Nym cert/key file for non-credential Nyms.
    pub fn legacy_cert_file(&self, nym: &NymId) -> PathBuf {
        self.root.join("certs").join(format!("{}.cert", nym.0))
    }

    /// Per-server mint file, one per asset.
    pub fn mint_file(&self, server: &ServerId, asset: &str) -> PathBuf {
        self.root
            .join("mints")
            .join(&server.0)
            .join(format!("{asset}.mint"))
    }

    /// Last-known-good balance receipt per (server, account).
    pub fn receipt_file(&self, server: &ServerId, account: &AccountId) -> PathBuf {
        self.root
            .join("receipts")
            .join(&server.0)
            .join(format!("{}.receipt", account.0))
    }

    /// Box folder: inbox/outbox/nymbox/paymentInbox/recordBox/expiredBox
    /// per (Nym, account).
    pub fn box_file(&self, nym: &NymId, account: &AccountId, kind: BoxKind) -> PathBuf {
        self.root
            .join("boxes")
            .join(&nym.0)
            .join(format!("{}.{}", account.0, box_suffix(kind)))
    }

    /// Full bodies of abbreviated box entries, indexed by transaction
    /// number.
    pub fn box_receipt_file(&self, nym: &NymId, transaction_number: u64) -> PathBuf {
        self.root
            .join("box_receipts")
            .join(&nym.0)
            .join(format!("{transaction_number}.xml"))
    }

    /// PID lock file path — deliberately out of scope per §1; kept only so
    /// callers that probe the layout don't need a separate code path.
    pub fn pid_lock_file(&self) -> PathBuf {
        self.root.join("notary.pid")
    }
}

fn box_suffix(kind: BoxKind) -> &'static str {
    match kind {
        BoxKind::Nymbox => "nymbox",
        BoxKind::Inbox => "inbox",
        BoxKind::Outbox => "outbox",
        BoxKind::PaymentInbox => "paymentInbox",
        BoxKind::RecordBox => "recordBox",
        BoxKind::ExpiredBox => "expiredBox",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_file_paths_are_distinct_per_kind() {
        let df = DataFolder::new("/data");
        let nym = NymId::from("alice");
        let acct = AccountId::from("acct-1");
        let inbox = df.box_file(&nym, &acct, BoxKind::Inbox);
        let outbox = df.box_file(&nym, &acct, BoxKind::Outbox);
        assert_ne!(inbox, outbox);
        assert!(inbox.to_string_lossy().ends_with("inbox"));
    }

    #[cfg(feature = "file-signer")]
    #[test]
    fn default_location_is_rooted_under_the_home_directory() {
        let df = DataFolder::default_location().unwrap();
        assert!(df.root().ends_with(".notary"));
    }
}

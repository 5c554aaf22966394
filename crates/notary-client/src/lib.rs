//! # notary-client
//!
//! A clean, ergonomic Rust client for a server-mediated financial
//! transaction notary: cheques, vouchers, blinded cash purses, recurring
//! payment plans, and multi-party smart contracts, all settled against a
//! notary server that a [`Client`] never trusts with more than it has to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notary_client::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let transport = Arc::new(client::transport::LoopbackTransport::new(|_env| {
//!         unimplemented!("wire up a real Transport in production")
//!     }));
//!     let client = Client::open(wallet::fs::DataFolder::new("~/.notary"), "hunter2", transport);
//!
//!     let nym = Nym::generate(Some("alice".into()));
//!     let nym_id = nym.id().clone();
//!     client.wallet().insert_nym(nym)?;
//!
//!     // ... register a server and an asset account, then:
//!     // let cheque = client.write_cheque(&nym_id, &server_id, &account_id, 500, validity, None)?;
//!     let _ = nym_id;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Single entry point** — every operation flows through [`Client`],
//!    which owns one wallet and one connection for the life of the process.
//! 2. **Numbers are capital** — transaction numbers are drawn, confirmed,
//!    and harvested explicitly; nothing is spent without accounting for it
//!    (§4.1).
//! 3. **Writing isn't sending** — composing a payment instrument (a
//!    cheque, a proposed payment plan) is local; only depositing,
//!    activating, or canceling one touches the wire.
//! 4. **Crash-safe by staging** — anything that can fail midway (password
//!    rotation, record_payment) snapshots before it mutates durable state
//!    and only commits after every step that can still fail has succeeded.
//! 5. **No silent harvesting** — a network error never reclaims a
//!    transaction number on its own; only an explicit reply or the next
//!    nymbox reconciliation pass does (§7).
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|--------------|
//! | [`Client`] | Main client — the single entry point for all operations |
//! | [`wallet::Wallet`] | In-memory registry of Nyms, servers, assets, and accounts |
//! | [`Nym`] | A pseudonymous identity with an Ed25519 signing key |
//! | [`ServerContract`] | A registered notary server endpoint |
//! | [`AssetContract`] | A registered asset type, basket or simple |
//! | [`AssetAccount`] | A ledger-backed balance at one server, for one asset |
//! | [`PaymentInstrument`] | A cheque, invoice, voucher, payment plan, smart contract, or notice |
//! | [`CashPurse`] | A purse of blinded cash tokens |
//!
//! ## Error Handling
//!
//! All operations return `Result<T, notary_client::Error>`. [`Error`]
//! classifies every failure into the taxonomy from §7, and
//! [`Error::exit_code`] maps each kind to a distinct process exit code for
//! the CLI.
//!
//! ## Concurrency Model
//!
//! A [`Client`] is deliberately not `Clone`: it owns one wallet behind a
//! mutex and one transport connection behind an async mutex, so a
//! request/response pair is atomic from the caller's point of view (§5).
//! Running several Nyms concurrently means opening several `Client`s.

pub mod clock;
pub mod client;
pub mod error;
pub mod types;
pub mod wallet;

pub use client::Client;
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use error::{Error, KeyStoreError, ParseKeyError, SignerError};
pub use types::*;
pub use wallet::Wallet;

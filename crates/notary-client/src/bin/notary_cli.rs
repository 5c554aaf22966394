//! `notary-cli` — the CLI bindings for `Client` listed in §6.
//!
//! The OpenSSL/ZMQ socket layer is out of scope (§1): this binary ships
//! only the `Transport` trait boundary, so every command that needs to
//! reach a server runs against a configurable [`LoopbackTransport`] rather
//! than a real socket. Point it at a real deployment by swapping in a
//! concrete `Transport` impl; until then `--echo` simulates a notary that
//! accepts everything, which is enough to exercise the full command
//! surface end to end.
//!
//! Wallet persistence across invocations is also out of scope for this
//! binary (§1 excludes the concrete wire/file format): each invocation
//! opens a fresh in-memory wallet under the given data folder. Multi-step
//! flows (propose/confirm a payment plan, build/activate a smart contract)
//! thread the intermediate object through as JSON on the command line
//! between invocations rather than relying on on-disk wallet state.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use notary_client::client::market::MarketOfferTerms;
use notary_client::client::transport::{LoopbackTransport, Transport};
use notary_client::types::asset_contract::SubAsset;
use notary_client::types::envelope::{IncomingEnvelope, ReplyBody, ReplyOutcome};
use notary_client::types::instrument::{
    InstrumentCommon, PartyId, PaymentPlan, SmartContract, SmartContractAccount, SmartContractParty,
    ValidityWindow,
};
use notary_client::types::{AssetAccount, AssetId, CashPurse, Endpoint, NymId, ServerContract, ServerId};
use notary_client::wallet::fs::DataFolder;
use notary_client::{AccountId, Client, Error};

#[derive(Parser)]
#[command(name = "notary-cli", about = "CLI bindings for the notary client (§6)")]
struct Cli {
    /// Data folder root (§6 filesystem layout). Defaults to `~/.notary`,
    /// resolved via the platform home directory when unset.
    #[arg(long, env = "NOTARY_DATA_DIR")]
    data_dir: Option<String>,

    /// Wallet passphrase.
    #[arg(long, env = "NOTARY_PASSPHRASE", default_value = "hunter2")]
    passphrase: String,

    /// Simulate a notary that accepts every request instead of refusing
    /// to connect. Without this flag every network command fails with
    /// `Network` — there is no real transport wired up (§1).
    #[arg(long)]
    echo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    RegisterNym { name: Option<String> },
    RegisterServerContract { id: String, host: String, port: u16 },
    RemoveNym { nym: String },
    RemoveServer { server: String },
    RemoveAsset { asset: String },
    RemoveAccount { account: String },
    RegisterAccount { account: String, nym: String, asset: String, server: String },
    WriteCheque {
        nym: String,
        server: String,
        account: String,
        amount: i64,
        valid_from: i64,
        valid_to: i64,
        memo: Option<String>,
    },
    DiscardCheque { nym: String, index: usize },
    DepositCheque {
        nym: String,
        server: String,
        account: String,
        /// A `Cheque`, as JSON (as printed by `write-cheque`).
        cheque_json: String,
    },
    WithdrawVoucher {
        nym: String,
        server: String,
        account: String,
        amount: i64,
        valid_from: i64,
        valid_to: i64,
    },
    WithdrawCash { nym: String, server: String, account: String, asset: String, amount: i64 },
    DepositCash {
        nym: String,
        server: String,
        account: String,
        /// A `CashPurse`, as JSON (as printed by `withdraw-cash`).
        purse_json: String,
    },
    IssueBasket {
        id: String,
        name: String,
        /// JSON array of `{"asset": "...", "minimum_transfer": N}`.
        sub_assets_json: String,
        minimum_transfer: u64,
    },
    ExchangeBasket {
        nym: String,
        server: String,
        main_account: String,
        /// JSON array of `["sub_account_id", delta]` pairs.
        deltas_json: String,
    },
    PayDividend {
        nym: String,
        server: String,
        account: String,
        amount_per_share: i64,
        /// JSON array of `["nym_id", shares]` pairs.
        shareholders_json: String,
        valid_from: i64,
        valid_to: i64,
    },
    IssueMarketOffer {
        nym: String,
        server: String,
        /// Full `MarketOfferTerms`, as JSON.
        terms_json: String,
    },
    GetMarketOffers { nym: String, server: String, asset: String },
    CancelCronItem { nym: String, server: String, target_number: u64 },
    ProposePaymentPlan {
        merchant_nym: String,
        server: String,
        merchant_account: String,
        asset: String,
        valid_from: i64,
        valid_to: i64,
        memo: Option<String>,
    },
    ConfirmPaymentPlan {
        /// A `PaymentPlan`, as JSON (as printed by `propose-payment-plan`).
        plan_json: String,
        payer_nym: String,
        server: String,
        payer_account: String,
    },
    DepositPaymentPlan {
        payer_nym: String,
        server: String,
        /// A confirmed `PaymentPlan`, as JSON (as printed by `confirm-payment-plan`).
        plan_json: String,
    },
    CancelPaymentPlan {
        /// A `PaymentPlan`, as JSON.
        plan_json: String,
        canceler: String,
        server: String,
    },
    SmartContractBuild {
        asset: String,
        server: String,
        valid_from: i64,
        valid_to: i64,
        memo: Option<String>,
        /// JSON array of `{"id": "...", "nym": "..."}`.
        parties_json: String,
        /// JSON array of `{"account_id": "...", "owning_party": "...", "asset": "..."}`.
        accounts_json: String,
        /// Party ids to confirm immediately, as a JSON array of strings.
        confirm_json: String,
    },
    SmartContractActivate {
        /// A `SmartContract`, as JSON (as printed by `smart-contract-build`).
        contract_json: String,
        server: String,
        activator_party: String,
        activator_nym: String,
    },
    TriggerClause {
        /// A `SmartContract`, as JSON.
        contract_json: String,
        clause_name: String,
    },
    RecordPayment {
        nym: String,
        server: String,
        index: usize,
        #[arg(long)]
        related_receipt_present: bool,
    },
    ClearRecord { nym: String },
    ClearExpired { nym: String },
    RotatePassword { current: String, new: String },
}

fn echo_transport() -> Arc<dyn Transport> {
    Arc::new(LoopbackTransport::new(|env| {
        Ok(IncomingEnvelope {
            body: ReplyBody {
                command: env.body.command.clone(),
                request_number: env.body.request_number,
                outcome: ReplyOutcome::Success,
                new_nymbox_hash: Some(format!("hash-{}", env.body.request_number.0)),
                detail: None,
            },
            signature: vec![],
        })
    }))
}

fn refusing_transport() -> Arc<dyn Transport> {
    Arc::new(LoopbackTransport::new(|_env| {
        Err(Error::Network {
            message: "no transport configured; pass --echo or wire up a real Transport".into(),
            retryable: false,
        })
    }))
}

#[cfg(feature = "file-signer")]
fn default_data_folder() -> Result<DataFolder, Error> {
    DataFolder::default_location()
}

#[cfg(not(feature = "file-signer"))]
fn default_data_folder() -> Result<DataFolder, Error> {
    Ok(DataFolder::new("./.notary"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from((e.exit_code() & 0xff) as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let transport = if cli.echo { echo_transport() } else { refusing_transport() };
    let data_folder = match cli.data_dir {
        Some(path) => DataFolder::new(path),
        None => default_data_folder()?,
    };
    let client = Client::open(data_folder, &cli.passphrase, transport);

    match cli.command {
        Command::RegisterNym { name } => {
            let nym = notary_client::Nym::generate(name);
            println!("{}", nym.id());
            client.wallet().insert_nym(nym)?;
        }
        Command::RegisterServerContract { id, host, port } => {
            let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
            let contract = ServerContract::new(
                ServerId::from(id),
                vec![Endpoint::Tcp { host, port }],
                signing.verifying_key(),
            );
            client.wallet().insert_server(contract)?;
        }
        Command::RemoveNym { nym } => client.wallet().remove_nym(&NymId::from(nym))?,
        Command::RemoveServer { server } => client.wallet().remove_server(&ServerId::from(server))?,
        Command::RemoveAsset { asset } => client.wallet().remove_asset(&AssetId::from(asset))?,
        Command::RemoveAccount { account } => client.wallet().remove_account(&AccountId::from(account))?,
        Command::RegisterAccount { account, nym, asset, server } => {
            let acct = AssetAccount::new(
                AccountId::from(account),
                NymId::from(nym),
                AssetId::from(asset),
                ServerId::from(server),
            );
            client.wallet().insert_account(acct)?;
        }
        Command::WriteCheque { nym, server, account, amount, valid_from, valid_to, memo } => {
            let cheque = client.write_cheque(
                &NymId::from(nym),
                &ServerId::from(server),
                &AccountId::from(account),
                amount,
                ValidityWindow::new(valid_from, valid_to),
                memo,
            )?;
            println!("{}", serde_json::to_string_pretty(&cheque)?);
        }
        Command::DiscardCheque { nym, index } => {
            let entry = client.discard_cheque(&NymId::from(nym), index)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::DepositCheque { nym, server, account, cheque_json } => {
            let cheque = serde_json::from_str(&cheque_json)?;
            client
                .deposit_cheque(&NymId::from(nym), &ServerId::from(server), &AccountId::from(account), &cheque)
                .await?;
        }
        Command::WithdrawVoucher { nym, server, account, amount, valid_from, valid_to } => {
            let voucher = client
                .withdraw_voucher(
                    &NymId::from(nym),
                    &ServerId::from(server),
                    &AccountId::from(account),
                    amount,
                    ValidityWindow::new(valid_from, valid_to),
                    None,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&voucher)?);
        }
        Command::WithdrawCash { nym, server, account, asset, amount } => {
            let purse = client
                .withdraw_cash(
                    &NymId::from(nym),
                    &ServerId::from(server),
                    &AccountId::from(account),
                    &AssetId::from(asset),
                    amount,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&purse)?);
        }
        Command::DepositCash { nym, server, account, purse_json } => {
            let purse: CashPurse = serde_json::from_str(&purse_json)?;
            client
                .deposit_cash(&NymId::from(nym), &ServerId::from(server), &AccountId::from(account), &purse)
                .await?;
        }
        Command::IssueBasket { id, name, sub_assets_json, minimum_transfer } => {
            let sub_assets: Vec<SubAsset> = serde_json::from_str(&sub_assets_json)?;
            client.issue_basket(AssetId::from(id), name, sub_assets, minimum_transfer)?;
        }
        Command::ExchangeBasket { nym, server, main_account, deltas_json } => {
            let raw: Vec<(String, i64)> = serde_json::from_str(&deltas_json)?;
            let deltas = raw.into_iter().map(|(id, delta)| (AccountId::from(id), delta)).collect();
            client
                .exchange_basket(&NymId::from(nym), &ServerId::from(server), &AccountId::from(main_account), deltas)
                .await?;
        }
        Command::PayDividend { nym, server, account, amount_per_share, shareholders_json, valid_from, valid_to } => {
            let raw: Vec<(String, i64)> = serde_json::from_str(&shareholders_json)?;
            let shareholders = raw.into_iter().map(|(id, shares)| (NymId::from(id), shares)).collect();
            let cheques = client.pay_dividend(
                &NymId::from(nym),
                &ServerId::from(server),
                &AccountId::from(account),
                amount_per_share,
                shareholders,
                ValidityWindow::new(valid_from, valid_to),
                None,
            )?;
            println!("{}", serde_json::to_string_pretty(&cheques)?);
        }
        Command::IssueMarketOffer { nym, server, terms_json } => {
            let terms: MarketOfferTerms = serde_json::from_str(&terms_json)?;
            client.issue_market_offer(&NymId::from(nym), &ServerId::from(server), terms).await?;
        }
        Command::GetMarketOffers { nym, server, asset } => {
            let offers = client
                .get_market_offers(&NymId::from(nym), &ServerId::from(server), &AssetId::from(asset))
                .await?;
            println!("{}", serde_json::to_string_pretty(&offers)?);
        }
        Command::ProposePaymentPlan { merchant_nym, server, merchant_account, asset, valid_from, valid_to, memo } => {
            let common = InstrumentCommon {
                asset: AssetId::from(asset),
                server: ServerId::from(server.clone()),
                validity: ValidityWindow::new(valid_from, valid_to),
                memo,
            };
            let plan = client.propose_payment_plan(
                &NymId::from(merchant_nym),
                &ServerId::from(server),
                AccountId::from(merchant_account),
                common,
            )?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::ConfirmPaymentPlan { plan_json, payer_nym, server, payer_account } => {
            let mut plan: PaymentPlan = serde_json::from_str(&plan_json)?;
            client.confirm_payment_plan(
                &mut plan,
                &NymId::from(payer_nym),
                &ServerId::from(server),
                AccountId::from(payer_account),
            )?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::DepositPaymentPlan { payer_nym, server, plan_json } => {
            let plan: PaymentPlan = serde_json::from_str(&plan_json)?;
            client.deposit_payment_plan(&NymId::from(payer_nym), &ServerId::from(server), &plan).await?;
        }
        Command::CancelPaymentPlan { plan_json, canceler, server } => {
            let mut plan: PaymentPlan = serde_json::from_str(&plan_json)?;
            client.cancel_payment_plan(&mut plan, &NymId::from(canceler), &ServerId::from(server))?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::SmartContractBuild { asset, server, valid_from, valid_to, memo, parties_json, accounts_json, confirm_json } => {
            #[derive(serde::Deserialize)]
            struct RawParty {
                id: String,
                nym: String,
            }
            #[derive(serde::Deserialize)]
            struct RawAccount {
                account_id: String,
                owning_party: String,
                asset: String,
            }
            let common = InstrumentCommon {
                asset: AssetId::from(asset),
                server: ServerId::from(server),
                validity: ValidityWindow::new(valid_from, valid_to),
                memo,
            };
            let mut contract = client.smart_contract_create(common);

            let raw_parties: Vec<RawParty> = serde_json::from_str(&parties_json)?;
            for p in raw_parties {
                client.smart_contract_add_party(
                    &mut contract,
                    SmartContractParty { id: PartyId(p.id), nym: NymId::from(p.nym) },
                )?;
            }

            let raw_accounts: Vec<RawAccount> = serde_json::from_str(&accounts_json)?;
            for a in raw_accounts {
                client.smart_contract_add_account(
                    &mut contract,
                    SmartContractAccount {
                        account_id: AccountId::from(a.account_id),
                        owning_party: PartyId(a.owning_party),
                        asset: AssetId::from(a.asset),
                    },
                )?;
            }

            let confirm: Vec<String> = serde_json::from_str(&confirm_json)?;
            for party_id in confirm {
                client.smart_contract_confirm_party(&mut contract, PartyId(party_id))?;
            }

            println!("{}", serde_json::to_string_pretty(&contract)?);
        }
        Command::SmartContractActivate { contract_json, server, activator_party, activator_nym } => {
            let mut contract: SmartContract = serde_json::from_str(&contract_json)?;
            client.smart_contract_activate(
                &mut contract,
                &ServerId::from(server),
                &PartyId(activator_party),
                &NymId::from(activator_nym),
            )?;
            println!("{}", serde_json::to_string_pretty(&contract)?);
        }
        Command::TriggerClause { contract_json, clause_name } => {
            let contract: SmartContract = serde_json::from_str(&contract_json)?;
            client.trigger_clause(&contract, &clause_name)?;
        }
        Command::CancelCronItem { nym, server, target_number } => {
            client
                .cancel_cron_item(
                    &NymId::from(nym),
                    &ServerId::from(server),
                    notary_client::TransactionNumber(target_number),
                )
                .await?;
        }
        Command::RecordPayment { nym, server, index, related_receipt_present } => {
            client.record_outgoing_payment(
                &NymId::from(nym),
                &ServerId::from(server),
                index,
                related_receipt_present,
            )?;
        }
        Command::ClearRecord { nym } => {
            let n = client.clear_record(&NymId::from(nym))?;
            println!("cleared {n} record entries");
        }
        Command::ClearExpired { nym } => {
            let n = client.clear_expired(&NymId::from(nym))?;
            println!("cleared {n} expired entries");
        }
        Command::RotatePassword { current, new } => {
            client.rotate_password(&current, &new)?;
        }
    }
    Ok(())
}

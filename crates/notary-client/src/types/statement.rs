//! Balance and transaction statements (§4.3).
//!
//! A statement is the signed attestation a `Transaction` carries pinning the
//! client's view of their account (or their outstanding numbers) at request
//! time, so the server can prove either side cheated if the post-conditions
//! don't match.

use serde::{Deserialize, Serialize};

use crate::types::ids::{AccountId, TransactionNumber};

/// A snapshot of one box entry's receipt hash, as attached to a balance
/// statement (§4.3: "the exact set of abbreviated receipts currently in
/// inbox + outbox").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDigest {
    pub transaction_number: TransactionNumber,
    pub hash: String,
}

/// Signs off on: current balance, the delta, the resulting balance, and the
/// exact abbreviated-receipt set in inbox+outbox at the time of signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceStatement {
    pub account: AccountId,
    pub current_balance: i64,
    pub delta: i64,
    pub resulting_balance: i64,
    pub inbox_receipts: Vec<ReceiptDigest>,
    pub outbox_receipts: Vec<ReceiptDigest>,
}

impl BalanceStatement {
    pub fn new(
        account: AccountId,
        current_balance: i64,
        delta: i64,
        inbox_receipts: Vec<ReceiptDigest>,
        outbox_receipts: Vec<ReceiptDigest>,
    ) -> Self {
        Self {
            account,
            current_balance,
            delta,
            resulting_balance: current_balance + delta,
            inbox_receipts,
            outbox_receipts,
        }
    }

    /// The statement must be internally consistent before it is ever
    /// signed (§4.3: "the statement's validity is verified locally before
    /// signing").
    pub fn is_internally_consistent(&self) -> bool {
        self.resulting_balance == self.current_balance + self.delta
    }
}

/// Signs off on the set of transaction numbers committed to an operation
/// that only spends numbers without changing a balance (market offers,
/// smart contract confirmations).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionStatement {
    pub numbers: Vec<TransactionNumber>,
}

impl TransactionStatement {
    pub fn new(numbers: Vec<TransactionNumber>) -> Self {
        Self { numbers }
    }
}

/// Either kind of statement a transaction request carries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Statement {
    Balance(BalanceStatement),
    Transaction(TransactionStatement),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistent_statement_passes_local_check() {
        let stmt = BalanceStatement::new(AccountId::from("acct-a"), 500, -100, vec![], vec![]);
        assert!(stmt.is_internally_consistent());
        assert_eq!(stmt.resulting_balance, 400);
    }

    #[test]
    fn tampered_resulting_balance_fails_local_check() {
        let mut stmt = BalanceStatement::new(AccountId::from("acct-a"), 500, -100, vec![], vec![]);
        stmt.resulting_balance = 999;
        assert!(!stmt.is_internally_consistent());
    }
}

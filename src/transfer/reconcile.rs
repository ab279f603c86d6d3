//! Ledger reconciliation
//!
//! Replays the ledger on top of opening balances and compares the result with
//! the live store. A transfer whose balances moved but whose ledger pair never
//! landed shows up as a balance mismatch on both of its accounts.
//!
//! Only meaningful while no transfer is in flight.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AccountId, TransactionType};
use crate::error::AppResult;
use crate::ledger::TransactionLedger;
use crate::store::AccountStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// opening + credits - debits differs from the live balance
    BalanceMismatch {
        account_id: AccountId,
        expected: Decimal,
        actual: Decimal,
    },
    /// A transfer without exactly one DEBIT and one CREDIT
    UnpairedTransfer {
        transfer_id: Uuid,
        debits: usize,
        credits: usize,
    },
    /// A ledger entry that references an account the store does not know
    UnknownAccount { account_id: AccountId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub account_count: usize,
    pub entry_count: usize,
    pub opening_total: Decimal,
    pub current_total: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    /// Zero-sum holds and every account and transfer checks out
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
            && self.opening_total == self.current_total
            && self.total_debits == self.total_credits
    }
}

#[derive(Default)]
struct Sides {
    debits: usize,
    credits: usize,
}

pub fn reconcile(store: &AccountStore, ledger: &TransactionLedger) -> AppResult<ReconciliationReport> {
    let snapshot = store.snapshot()?;
    let entries = ledger.list_all()?;

    let mut net: BTreeMap<&AccountId, Decimal> = BTreeMap::new();
    let mut transfers: HashMap<Uuid, Sides> = HashMap::new();
    let mut total_debits = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;

    for entry in &entries {
        let amount = entry.amount.value();
        let sides = transfers.entry(entry.transfer_id).or_default();
        match entry.transaction_type {
            TransactionType::Debit => {
                total_debits += amount;
                sides.debits += 1;
                *net.entry(&entry.account_id).or_default() -= amount;
            }
            TransactionType::Credit => {
                total_credits += amount;
                sides.credits += 1;
                *net.entry(&entry.account_id).or_default() += amount;
            }
        }
    }

    let mut discrepancies = Vec::new();

    for s in &snapshot {
        let expected = s.opening_balance.value() + net.remove(&s.account.id).unwrap_or_default();
        let actual = s.account.balance.value();
        if expected != actual {
            discrepancies.push(Discrepancy::BalanceMismatch {
                account_id: s.account.id.clone(),
                expected,
                actual,
            });
        }
    }

    // Whatever is left in `net` belongs to accounts the store does not have
    discrepancies.extend(net.into_keys().map(|id| Discrepancy::UnknownAccount {
        account_id: id.clone(),
    }));

    let mut unpaired: Vec<Discrepancy> = transfers
        .into_iter()
        .filter(|(_, sides)| sides.debits != 1 || sides.credits != 1)
        .map(|(transfer_id, sides)| Discrepancy::UnpairedTransfer {
            transfer_id,
            debits: sides.debits,
            credits: sides.credits,
        })
        .collect();
    unpaired.sort_by_key(|d| match d {
        Discrepancy::UnpairedTransfer { transfer_id, .. } => *transfer_id,
        _ => Uuid::nil(),
    });
    discrepancies.extend(unpaired);

    Ok(ReconciliationReport {
        account_count: snapshot.len(),
        entry_count: entries.len(),
        opening_total: snapshot.iter().map(|s| s.opening_balance.value()).sum(),
        current_total: snapshot.iter().map(|s| s.account.balance.value()).sum(),
        total_debits,
        total_credits,
        discrepancies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Balance, Transaction, TransferLeg};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn setup() -> (AccountStore, TransactionLedger) {
        let store = AccountStore::new();
        store
            .open_account("ACC001".into(), "Main", Balance::new(dec!(1000)).unwrap())
            .unwrap();
        store
            .open_account("ACC002".into(), "Savings", Balance::new(dec!(500)).unwrap())
            .unwrap();
        (store, TransactionLedger::new())
    }

    fn record(ledger: &TransactionLedger, from: &str, to: &str, amount: Decimal) -> Vec<Transaction> {
        let (from, to) = (AccountId::new(from), AccountId::new(to));
        let pair = Transaction::double_entry(
            TransferLeg {
                transfer_id: Uuid::new_v4(),
                from: &from,
                to: &to,
                amount: Amount::new(amount).unwrap(),
                note: "",
                timestamp: Utc::now(),
            },
            ledger.next_id().unwrap(),
            ledger.next_id().unwrap(),
        );
        pair.to_vec()
    }

    #[test]
    fn test_clean_ledger_is_consistent() {
        let (store, ledger) = setup();
        store.apply_transfer(&"ACC001".into(), &"ACC002".into(), dec!(100)).unwrap();
        ledger.append(record(&ledger, "ACC001", "ACC002", dec!(100))).unwrap();

        let report = reconcile(&store, &ledger).unwrap();
        assert!(report.is_consistent(), "{report:?}");
        assert_eq!(report.opening_total, dec!(1500));
        assert_eq!(report.current_total, dec!(1500));
        assert_eq!(report.entry_count, 2);
    }

    #[test]
    fn test_missing_ledger_pair_is_detected() {
        let (store, ledger) = setup();
        // Balances moved, ledger append never happened
        store.apply_transfer(&"ACC001".into(), &"ACC002".into(), dec!(100)).unwrap();

        let report = reconcile(&store, &ledger).unwrap();
        assert!(!report.is_consistent());
        assert_eq!(
            report.discrepancies,
            vec![
                Discrepancy::BalanceMismatch {
                    account_id: "ACC001".into(),
                    expected: dec!(1000),
                    actual: dec!(900),
                },
                Discrepancy::BalanceMismatch {
                    account_id: "ACC002".into(),
                    expected: dec!(500),
                    actual: dec!(600),
                },
            ]
        );
    }

    #[test]
    fn test_orphaned_entry_is_detected() {
        let (store, ledger) = setup();
        let mut pair = record(&ledger, "ACC001", "ACC002", dec!(5));
        pair.truncate(1);
        ledger.append(pair).unwrap();

        let report = reconcile(&store, &ledger).unwrap();
        assert!(report
            .discrepancies
            .iter()
            .any(|d| matches!(d, Discrepancy::UnpairedTransfer { debits: 1, credits: 0, .. })));
        assert_ne!(report.total_debits, report.total_credits);
    }

    #[test]
    fn test_unknown_account_is_detected() {
        let (store, ledger) = setup();
        ledger.append(record(&ledger, "ACC001", "GHOST", dec!(5))).unwrap();

        let report = reconcile(&store, &ledger).unwrap();
        assert!(report.discrepancies.contains(&Discrepancy::UnknownAccount {
            account_id: "GHOST".into()
        }));
    }
}

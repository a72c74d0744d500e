//! Prepaid bucket resolver.

use crate::domain::{PrepaidEntry, PrepaidKind, add_amounts, sub_amounts};
use crate::error::Result;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketTotals {
    pub balance: Decimal,
    pub consumption: Decimal,
    pub prebilled: Decimal,
}

impl BucketTotals {
    pub fn remaining(&self) -> Result<Decimal> {
        let left = sub_amounts(self.balance, self.consumption, "restante prepagado")?;
        sub_amounts(left, self.prebilled, "restante prepagado")
    }

    fn add(&mut self, kind: &PrepaidKind, amount: Decimal) -> Result<()> {
        match kind {
            PrepaidKind::Balance => self.balance = add_amounts(self.balance, amount, "saldo")?,
            PrepaidKind::Consumption => {
                self.consumption = add_amounts(self.consumption, amount, "consumo")?
            }
            PrepaidKind::Prebilled => {
                self.prebilled = add_amounts(self.prebilled, amount, "prefacturado")?
            }
            PrepaidKind::Other(_) => {}
        }
        Ok(())
    }
}

/// Per-bucket totals keyed by exact (case-sensitive) bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrepaidSummary {
    pub buckets: BTreeMap<String, BucketTotals>,
}

impl PrepaidSummary {
    pub fn total_general(&self) -> Result<Decimal> {
        self.buckets.values().try_fold(Decimal::ZERO, |acc, b| {
            add_amounts(acc, b.remaining()?, "total prepagado")
        })
    }

    pub fn bucket(&self, name: &str) -> Option<&BucketTotals> {
        self.buckets.get(name)
    }
}

/// Entries of an unknown type still open their bucket but add nothing to it.
pub fn summarize<'a>(
    entries: impl IntoIterator<Item = &'a PrepaidEntry>,
) -> Result<PrepaidSummary> {
    let mut summary = PrepaidSummary::default();
    for entry in entries {
        summary
            .buckets
            .entry(entry.values.bucket.clone())
            .or_default()
            .add(&entry.values.kind, entry.values.amount)?;
    }
    Ok(summary)
}

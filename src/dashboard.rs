//! Monthly record aggregation behind the dashboard, the summary command and
//! the PDF report.

use crate::config::DEFAULT_DESDE;
use crate::db::{Order, Session};
use crate::domain::{EvolucionEntry, MonthlyRecord, add_amounts, sub_amounts};
use crate::error::Result;
use crate::month::{Month, MonthRange};
use crate::prepaid;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTotals {
    pub forecast: Decimal,
    pub billed: Decimal,
    /// Σ(pending_to_incur + pending_invoice)
    pub pending: Decimal,
}

impl RecordTotals {
    pub fn from_records(records: &[MonthlyRecord]) -> Result<Self> {
        records.iter().try_fold(Self::default(), |acc, r| {
            Ok(Self {
                forecast: add_amounts(acc.forecast, r.values.forecast, "total forecast")?,
                billed: add_amounts(acc.billed, r.values.billed, "total facturado")?,
                pending: add_amounts(acc.pending, r.pending()?, "total pendiente")?,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_forecast: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_billed: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_pending: Decimal,
    /// forecast - billed
    #[serde(with = "rust_decimal::serde::float")]
    pub wip: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_prepaid: Decimal,
    /// wip + remaining prepaid
    #[serde(with = "rust_decimal::serde::float")]
    pub wip_total: Decimal,
    /// wip_total - pending
    #[serde(with = "rust_decimal::serde::float")]
    pub wip_calculated: Decimal,
}

impl DashboardSummary {
    pub fn new(records: &[MonthlyRecord], total_prepaid: Decimal) -> Result<Self> {
        let totals = RecordTotals::from_records(records)?;
        let wip = sub_amounts(totals.forecast, totals.billed, "WIP")?;
        let wip_total = add_amounts(wip, total_prepaid, "WIP total")?;
        Ok(Self {
            total_forecast: totals.forecast,
            total_billed: totals.billed,
            total_pending: totals.pending,
            wip,
            total_prepaid,
            wip_total,
            wip_calculated: sub_amounts(wip_total, totals.pending, "WIP calculado")?,
        })
    }
}

/// The `desde`/`hasta` query pair as typed by the user plus the range it
/// resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodFilter {
    pub desde: String,
    pub hasta: String,
    pub range: MonthRange,
}

impl PeriodFilter {
    /// An absent or empty `desde` falls back to the default first month; a
    /// value that is not `YYYY-MM` leaves that side of the range open.
    pub fn from_query(desde: Option<&str>, hasta: Option<&str>) -> Self {
        let desde = desde
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DESDE)
            .to_string();
        let hasta = hasta.unwrap_or_default().to_string();
        let range = MonthRange {
            from: parse_bound(&desde),
            to: parse_bound(&hasta),
        };
        Self { desde, hasta, range }
    }
}

fn parse_bound(raw: &str) -> Option<Month> {
    if raw.is_empty() {
        None
    } else {
        Month::parse_label(raw)
    }
}

/// Everything the dashboard (and the report) shows for a period.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub filter: PeriodFilter,
    pub summary: DashboardSummary,
    pub records: Vec<MonthlyRecord>,
    pub evolucion: Vec<EvolucionEntry>,
}

/// Remaining prepaid total across all buckets; any failure reads as zero so
/// the dashboard still renders.
pub fn prepaid_total_or_zero(session: &Session<'_>) -> Decimal {
    let total = session
        .list_prepaid()
        .and_then(|entries| prepaid::summarize(&entries)?.total_general());
    match total {
        Ok(total) => total,
        Err(err) => {
            tracing::warn!(error = %err, "prepaid total unavailable, using 0");
            Decimal::ZERO
        }
    }
}

pub fn load(session: &Session<'_>, filter: PeriodFilter) -> Result<DashboardData> {
    let records = session.list_records(&filter.range, Order::Ascending)?;
    let evolucion = session.list_evolucion(&filter.range, Order::Ascending)?;
    let summary = DashboardSummary::new(&records, prepaid_total_or_zero(session))?;
    tracing::debug!(
        total_forecast = %summary.total_forecast,
        total_billed = %summary.total_billed,
        "dashboard totals"
    );
    Ok(DashboardData {
        filter,
        summary,
        records,
        evolucion,
    })
}

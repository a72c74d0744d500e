//! Running balance of the "Evolución de la Bolsa" ledger.
//!
//! Each month's accumulated value is the exact previous calendar month's
//! accumulated value plus the month's increment. A missing predecessor
//! counts as zero, so a gap in the months restarts the chain.
//!
//! Creating an entry adds a constant [`CREATE_OFFSET`] on top of that sum;
//! editing does not. Neither path touches later months.

use crate::db::{EVOLUCION_KIND, Order, Session};
use crate::domain::{EvolucionEntry, add_amounts};
use crate::error::{Error, Result};
use crate::month::{Month, MonthRange};
use rust_decimal::Decimal;

/// Added to the running balance when an entry is created, never on edit.
// TODO: confirm with the product owner whether this offset is intended; if
// not, drop it here and re-run `rebuild-ledger` on existing data.
pub const CREATE_OFFSET: Decimal = Decimal::ONE;

pub fn accumulated_on_create(previous: Decimal, increment: Decimal) -> Result<Decimal> {
    add_amounts(accumulated_on_edit(previous, increment)?, CREATE_OFFSET, "acumulado")
}

pub fn accumulated_on_edit(previous: Decimal, increment: Decimal) -> Result<Decimal> {
    add_amounts(previous, increment, "acumulado")
}

/// Accumulated value of the row for the month right before `month`, or zero.
pub fn previous_accumulated(session: &Session<'_>, month: Month) -> Result<Decimal> {
    Ok(session
        .find_evolucion_by_month(month.previous())?
        .map(|e| e.accumulated)
        .unwrap_or(Decimal::ZERO))
}

pub fn create_entry(
    session: &Session<'_>,
    month: Month,
    increment: Decimal,
) -> Result<EvolucionEntry> {
    let previous = previous_accumulated(session, month)?;
    let accumulated = accumulated_on_create(previous, increment)?;
    let id = session.insert_evolucion(month, increment, accumulated)?;
    tracing::debug!(%month, %increment, %accumulated, "evolucion entry created");
    Ok(EvolucionEntry {
        id,
        month,
        increment,
        accumulated,
    })
}

pub fn update_entry(
    session: &Session<'_>,
    id: i64,
    month: Month,
    increment: Decimal,
) -> Result<EvolucionEntry> {
    if session.get_evolucion(id)?.is_none() {
        return Err(Error::NotFound {
            kind: EVOLUCION_KIND,
            id,
        });
    }
    let previous = previous_accumulated(session, month)?;
    let accumulated = accumulated_on_edit(previous, increment)?;
    session.update_evolucion(id, month, increment, accumulated)?;
    tracing::debug!(id, %month, %increment, %accumulated, "evolucion entry updated");
    Ok(EvolucionEntry {
        id,
        month,
        increment,
        accumulated,
    })
}

pub fn delete_entry(session: &Session<'_>, id: i64) -> Result<()> {
    session.delete_evolucion(id)
}

/// Recomputes every entry from `from` (or the first entry) to the latest
/// month with the edit formula, in month order, so each row sees its
/// already-rebuilt predecessor. Returns how many rows changed.
pub fn rebuild_from(session: &Session<'_>, from: Option<Month>) -> Result<usize> {
    let range = MonthRange { from, to: None };
    let entries = session.list_evolucion(&range, Order::Ascending)?;

    let mut changed = 0;
    for entry in entries {
        let previous = previous_accumulated(session, entry.month)?;
        let accumulated = accumulated_on_edit(previous, entry.increment)?;
        if accumulated != entry.accumulated {
            session.update_evolucion(entry.id, entry.month, entry.increment, accumulated)?;
            changed += 1;
        }
    }

    tracing::info!(changed, from = ?from.map(Month::label), "evolucion ledger rebuilt");
    Ok(changed)
}

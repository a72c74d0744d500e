use crate::error::{Error, Result};
use crate::month::Month;
use rust_decimal::Decimal;
use serde::Serialize;

/// Largest magnitude accepted for a single entered amount (10^15).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// `a + b`, or [`Error::AmountOutOfRange`] naming `what` on overflow.
pub fn add_amounts(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal> {
    a.checked_add(b).ok_or(Error::AmountOutOfRange(what))
}

/// `a - b`, or [`Error::AmountOutOfRange`] naming `what` on overflow.
pub fn sub_amounts(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal> {
    a.checked_sub(b).ok_or(Error::AmountOutOfRange(what))
}

/// Editable columns of a monthly record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordInput {
    pub forecast: Decimal,
    pub billed: Decimal,
    pub pending_to_incur: Decimal,
    pub pending_invoice: Decimal,
    pub adjustment: Decimal,
    pub new_forecast: Decimal,
    pub real_plus_pending_debt: Decimal,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRecord {
    pub id: i64,
    pub month: Month,
    pub values: RecordInput,
}

impl MonthlyRecord {
    pub fn pending(&self) -> Result<Decimal> {
        add_amounts(
            self.values.pending_to_incur,
            self.values.pending_invoice,
            "pendiente",
        )
    }

    /// `(billed + pending_to_incur + pending_invoice) - forecast`
    pub fn remaining(&self) -> Result<Decimal> {
        let actual = add_amounts(self.values.billed, self.pending()?, "restante")?;
        sub_amounts(actual, self.values.forecast, "restante")
    }
}

/// One month of the "Evolución de la Bolsa" ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolucionEntry {
    pub id: i64,
    pub month: Month,
    pub increment: Decimal,
    pub accumulated: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PrepaidKind {
    Balance,
    #[default]
    Consumption,
    Prebilled,
    /// Any other stored value; ignored by the bucket totals.
    Other(String),
}

impl PrepaidKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "saldo" => PrepaidKind::Balance,
            "consumo" => PrepaidKind::Consumption,
            "prefacturado" => PrepaidKind::Prebilled,
            other => PrepaidKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PrepaidKind::Balance => "saldo",
            PrepaidKind::Consumption => "consumo",
            PrepaidKind::Prebilled => "prefacturado",
            PrepaidKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrepaidInput {
    pub bucket: String,
    pub concept: String,
    /// Free-text label such as "mayo"; never parsed.
    pub month_label: String,
    pub amount: Decimal,
    pub kind: PrepaidKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepaidEntry {
    pub id: i64,
    pub values: PrepaidInput,
}

/// Row of `GET /api/serie`.
#[derive(Debug, Clone, Serialize)]
pub struct SerieRow {
    pub mes: Month,
    #[serde(with = "rust_decimal::serde::float")]
    pub forecast: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub facturado: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pdt_incurrir: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub inc_pdte_factura: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub restante: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_forecast: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub real_mas_deuda_pend: Decimal,
}

impl TryFrom<&MonthlyRecord> for SerieRow {
    type Error = Error;

    fn try_from(r: &MonthlyRecord) -> Result<Self> {
        Ok(Self {
            mes: r.month,
            forecast: r.values.forecast,
            facturado: r.values.billed,
            pdt_incurrir: r.values.pending_to_incur,
            inc_pdte_factura: r.values.pending_invoice,
            restante: r.remaining()?,
            new_forecast: r.values.new_forecast,
            real_mas_deuda_pend: r.values.real_plus_pending_debt,
        })
    }
}

/// Row of `GET /api/evolucion`.
#[derive(Debug, Clone, Serialize)]
pub struct EvolucionRow {
    pub mes: Month,
    #[serde(with = "rust_decimal::serde::float")]
    pub incremento: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub acumulado: Decimal,
}

impl From<&EvolucionEntry> for EvolucionRow {
    fn from(e: &EvolucionEntry) -> Self {
        Self {
            mes: e.month,
            incremento: e.increment,
            acumulado: e.accumulated,
        }
    }
}

/// [`parse_amount`] for a named form field, rejecting magnitudes above
/// [`MAX_AMOUNT`].
pub fn form_amount(field: &'static str, raw: Option<&str>) -> Result<Decimal> {
    let amount = parse_amount(raw);
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::AmountOutOfRange(field));
    }
    Ok(amount)
}

/// Lenient amount parsing for form fields: blank or non-numeric input is zero.
pub fn parse_amount(raw: Option<&str>) -> Decimal {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Decimal::ZERO;
    };
    match s
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
    {
        Ok(d) => d,
        Err(_) => {
            tracing::warn!(value = s, "non-numeric amount coerced to zero");
            Decimal::ZERO
        }
    }
}

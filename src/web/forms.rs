//! Form and query payloads, and their conversion into domain inputs.
//!
//! Fields are optional strings so that a missing or malformed value can be
//! reported with a flash instead of a rejected request.

use crate::domain::{PrepaidInput, PrepaidKind, RecordInput, form_amount};
use crate::error::{Error, Result};
use crate::month::{Month, MonthInput, parse_month};
use serde::Deserialize;

fn required_month(raw: Option<&str>) -> Result<Month> {
    parse_month(MonthInput::from(raw)).require(raw)
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordForm {
    pub mes: Option<String>,
    pub forecast_1: Option<String>,
    pub facturado_2: Option<String>,
    pub pdt_incurrir_3: Option<String>,
    pub inc_pdte_factura_4: Option<String>,
    pub ajuste_fc: Option<String>,
    pub new_forecast: Option<String>,
    pub real_mas_deuda_pend: Option<String>,
    pub comentarios: Option<String>,
}

impl RecordForm {
    pub fn parse(&self) -> Result<(Month, RecordInput)> {
        let month = required_month(self.mes.as_deref())?;
        Ok((
            month,
            RecordInput {
                forecast: form_amount("forecast_1", self.forecast_1.as_deref())?,
                billed: form_amount("facturado_2", self.facturado_2.as_deref())?,
                pending_to_incur: form_amount("pdt_incurrir_3", self.pdt_incurrir_3.as_deref())?,
                pending_invoice: form_amount(
                    "inc_pdte_factura_4",
                    self.inc_pdte_factura_4.as_deref(),
                )?,
                adjustment: form_amount("ajuste_fc", self.ajuste_fc.as_deref())?,
                new_forecast: form_amount("new_forecast", self.new_forecast.as_deref())?,
                real_plus_pending_debt: form_amount(
                    "real_mas_deuda_pend",
                    self.real_mas_deuda_pend.as_deref(),
                )?,
                comment: non_blank(self.comentarios.as_deref()),
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EvolucionForm {
    pub mes: Option<String>,
    pub incremento: Option<String>,
}

impl EvolucionForm {
    pub fn parse(&self) -> Result<(Month, rust_decimal::Decimal)> {
        let month = required_month(self.mes.as_deref())?;
        Ok((month, form_amount("incremento", self.incremento.as_deref())?))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecomputeForm {
    pub desde: Option<String>,
}

impl RecomputeForm {
    /// Blank means "from the first entry".
    pub fn from_month(&self) -> Result<Option<Month>> {
        match non_blank(self.desde.as_deref()) {
            None => Ok(None),
            Some(raw) => required_month(Some(&raw)).map(Some),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PrepaidForm {
    pub bolsa: Option<String>,
    pub concepto: Option<String>,
    pub mes: Option<String>,
    pub tipo: Option<String>,
    pub importe: Option<String>,
}

impl PrepaidForm {
    pub fn parse(&self) -> Result<PrepaidInput> {
        // Stored verbatim: bucket names are matched exactly.
        let bucket = self
            .bolsa
            .clone()
            .filter(|b| !b.trim().is_empty())
            .ok_or(Error::MissingField("bolsa"))?;
        let kind = non_blank(self.tipo.as_deref())
            .map(|t| PrepaidKind::parse(&t))
            .unwrap_or_default();
        Ok(PrepaidInput {
            bucket,
            concept: self.concepto.clone().unwrap_or_default(),
            month_label: self.mes.clone().unwrap_or_default(),
            amount: form_amount("importe", self.importe.as_deref())?,
            kind,
        })
    }
}

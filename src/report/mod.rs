//! Downloadable PDF report of the dashboard.

pub mod chart;
pub mod pdf;

use crate::dashboard::{self, DashboardData, DashboardSummary, PeriodFilter};
use crate::db::Session;
use crate::error::Result;
use chrono::NaiveDateTime;
use chart::LineChart;
use rust_decimal::Decimal;

pub const TITLE: &str = "Informe Económico del Proyecto";
pub const FOOTER: &str = "Generado automáticamente desde el panel de Control Económico";

/// Inputs of one rendered report.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub generated_at: NaiveDateTime,
    pub desde: String,
    pub hasta: String,
    pub summary: DashboardSummary,
    pub charts: Vec<LineChart>,
}

impl ReportData {
    pub fn from_dashboard(data: &DashboardData, generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            desde: data.filter.desde.clone(),
            hasta: data.filter.hasta.clone(),
            summary: data.summary,
            charts: vec![
                chart::monthly_chart(&data.records),
                chart::ledger_chart(&data.evolucion),
            ],
        }
    }

    pub fn period_line(&self) -> String {
        let hasta = if self.hasta.is_empty() {
            "actualidad"
        } else {
            self.hasta.as_str()
        };
        format!("Periodo: desde {} hasta {hasta}", self.desde)
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn filename(at: NaiveDateTime) -> String {
    format!("informe_economico_{}.pdf", at.format("%Y%m%d_%H%M"))
}

pub fn generate(
    session: &Session<'_>,
    filter: PeriodFilter,
    generated_at: NaiveDateTime,
) -> Result<Report> {
    let data = dashboard::load(session, filter)?;
    let report = ReportData::from_dashboard(&data, generated_at);
    let bytes = pdf::render(&report)?;
    tracing::info!(
        bytes = bytes.len(),
        records = data.records.len(),
        "report rendered"
    );
    Ok(Report {
        filename: filename(generated_at),
        bytes,
    })
}

/// European currency format: `1.234,56 €`, `-250,00 €`.
pub fn format_euro(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped},{frac} €")
}

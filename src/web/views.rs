//! Server-rendered HTML pages.

use super::flash::Flash;
use crate::dashboard::DashboardData;
use crate::domain::{EvolucionEntry, MonthlyRecord, PrepaidEntry, PrepaidKind};
use crate::prepaid::PrepaidSummary;
use crate::report::chart::{LineChart, ledger_chart, monthly_chart};
use crate::report::format_euro;
use rust_decimal::Decimal;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; margin: 0; background: #f5f6fa; color: #222; }
header { background: #003366; color: #fff; padding: 12px 24px; }
header a { color: #fff; margin-right: 16px; text-decoration: none; }
main { padding: 24px; }
table { border-collapse: collapse; width: 100%; background: #fff; margin-bottom: 24px; }
th, td { border: 1px solid #ddd; padding: 4px 6px; font-size: 13px; }
th { background: #eef; }
input, select { font-size: 13px; max-width: 110px; }
.cards { display: flex; flex-wrap: wrap; gap: 12px; margin-bottom: 24px; }
.card { background: #fff; border-left: 4px solid #6c63ff; padding: 12px 16px; min-width: 180px; }
.card h3 { margin: 0 0 6px; font-size: 14px; }
.neg { color: #dc3545; }
.alert { padding: 10px 14px; margin-bottom: 16px; border-radius: 4px; }
.alert-success { background: #d4edda; }
.alert-info { background: #d1ecf1; }
.alert-danger { background: #f8d7da; }
.chart { background: #fff; width: 100%; max-width: 900px; margin-bottom: 24px; }
"#;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Currency cell; negative amounts are shown in red.
pub fn euro(value: Decimal) -> String {
    let class = if value.is_sign_negative() && !value.is_zero() {
        " class=\"neg\""
    } else {
        ""
    };
    format!("<span{class}>{}</span>", format_euro(value))
}

/// Currency cell for a derived amount that may not be representable.
fn euro_or_overflow(value: crate::error::Result<Decimal>) -> String {
    match value {
        Ok(v) => euro(v),
        Err(_) => r#"<span class="neg">fuera de rango</span>"#.to_string(),
    }
}

pub fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let banner = flash
        .map(|f| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html lang="es">
<head><meta charset="utf-8"><title>{title} · Control Económico</title><style>{STYLE}</style></head>
<body>
<header><a href="/">Dashboard</a><a href="/records">Meses</a><a href="/evolucion">Evolución bolsa</a><a href="/prepagado">Prepagado</a></header>
<main>
<h1>{title}</h1>
{banner}
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

fn card(label: &str, value: Decimal, accent: &str) -> String {
    format!(
        r#"<div class="card" style="border-color:{accent}"><h3>{label}</h3>{}</div>"#,
        euro(value)
    )
}

pub fn dashboard_page(data: &DashboardData, flash: Option<&Flash>) -> String {
    let s = &data.summary;
    let desde = escape(&data.filter.desde);
    let hasta = escape(&data.filter.hasta);

    let mut body = String::new();
    let _ = write!(
        body,
        r#"<form method="get" action="/">
<label>Desde <input type="month" name="desde" value="{desde}"></label>
<label>Hasta <input type="month" name="hasta" value="{hasta}"></label>
<button type="submit">Filtrar</button>
<a href="/informe-pdf?desde={desde}&amp;hasta={hasta}">Descargar informe PDF</a>
</form>"#
    );

    body.push_str(r#"<div class="cards">"#);
    body.push_str(&card("Total Forecast", s.total_forecast, "#6c63ff"));
    body.push_str(&card("Total Facturado", s.total_billed, "#00b894"));
    body.push_str(&card("WIP", s.wip, "#17a2b8"));
    body.push_str(&card("Prepagado restante", s.total_prepaid, "#fdcb6e"));
    body.push_str(&card("WIP total", s.wip_total, "#17a2b8"));
    body.push_str(&card("Pendiente", s.total_pending, "#e17055"));
    body.push_str(&card("WIP Calculado", s.wip_calculated, "#007bff"));
    body.push_str("</div>");

    for chart in [monthly_chart(&data.records), ledger_chart(&data.evolucion)] {
        body.push_str(&chart_block(&chart));
    }

    layout("Control Económico", flash, &body)
}

fn chart_block(chart: &LineChart) -> String {
    match chart.to_svg(900, 360) {
        Ok(svg) => format!(r#"<div class="chart">{svg}</div>"#),
        Err(err) => {
            tracing::warn!(title = chart.title, error = %err, "chart not rendered");
            format!(
                r#"<div class="chart"><p>{}: gráfica no disponible</p></div>"#,
                escape(chart.title)
            )
        }
    }
}

fn text_input(form: &str, name: &str, value: &str) -> String {
    format!(
        r#"<input form="{form}" name="{name}" value="{}">"#,
        escape(value)
    )
}

fn amount_input(form: &str, name: &str, value: Decimal) -> String {
    format!(r#"<input form="{form}" name="{name}" type="number" step="0.01" value="{value}">"#)
}

fn row_actions(base: &str, id: i64, form: &str) -> String {
    format!(
        r#"<form id="{form}" method="post" action="{base}/{id}/edit"></form>
<button form="{form}" type="submit">Guardar</button>
<form method="post" action="{base}/{id}/delete" style="display:inline"><button type="submit">Borrar</button></form>"#
    )
}

const RECORD_HEADERS: &str = "<tr><th>Mes</th><th>Forecast (1)</th><th>Facturado (2)</th><th>Pdt. incurrir (3)</th><th>Inc. pdte. factura (4)</th><th>Restante</th><th>Ajuste FC</th><th>New forecast</th><th>Real + deuda pend.</th><th>Comentarios</th><th></th></tr>";

pub fn records_page(records: &[MonthlyRecord], flash: Option<&Flash>) -> String {
    let mut body = String::new();
    body.push_str("<table>");
    body.push_str(RECORD_HEADERS);

    let new = "new-record";
    let _ = write!(
        body,
        r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><form id="{new}" method="post" action="/records/new"></form><button form="{new}" type="submit">Añadir</button></td></tr>"#,
        text_input(new, "mes", ""),
        amount_input(new, "forecast_1", Decimal::ZERO),
        amount_input(new, "facturado_2", Decimal::ZERO),
        amount_input(new, "pdt_incurrir_3", Decimal::ZERO),
        amount_input(new, "inc_pdte_factura_4", Decimal::ZERO),
        amount_input(new, "ajuste_fc", Decimal::ZERO),
        amount_input(new, "new_forecast", Decimal::ZERO),
        amount_input(new, "real_mas_deuda_pend", Decimal::ZERO),
        text_input(new, "comentarios", ""),
    );

    for r in records {
        let form = format!("record-{}", r.id);
        let v = &r.values;
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            text_input(&form, "mes", &r.month.label()),
            amount_input(&form, "forecast_1", v.forecast),
            amount_input(&form, "facturado_2", v.billed),
            amount_input(&form, "pdt_incurrir_3", v.pending_to_incur),
            amount_input(&form, "inc_pdte_factura_4", v.pending_invoice),
            euro_or_overflow(r.remaining()),
            amount_input(&form, "ajuste_fc", v.adjustment),
            amount_input(&form, "new_forecast", v.new_forecast),
            amount_input(&form, "real_mas_deuda_pend", v.real_plus_pending_debt),
            text_input(&form, "comentarios", v.comment.as_deref().unwrap_or_default()),
            row_actions("/records", r.id, &form),
        );
    }
    body.push_str("</table>");

    layout("Meses", flash, &body)
}

pub fn evolucion_page(entries: &[EvolucionEntry], flash: Option<&Flash>) -> String {
    let mut body = String::new();
    body.push_str(
        r#"<form method="post" action="/evolucion/recompute">
<label>Recalcular acumulados desde <input name="desde" placeholder="YYYY-MM"></label>
<button type="submit">Recalcular</button>
</form>"#,
    );
    body.push_str("<table><tr><th>Mes</th><th>Incremento</th><th>Acumulado</th><th></th></tr>");

    let new = "new-evolucion";
    let _ = write!(
        body,
        r#"<tr><td>{}</td><td>{}</td><td></td><td><form id="{new}" method="post" action="/evolucion/new"></form><button form="{new}" type="submit">Añadir</button></td></tr>"#,
        text_input(new, "mes", ""),
        amount_input(new, "incremento", Decimal::ZERO),
    );

    for e in entries {
        let form = format!("evolucion-{}", e.id);
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            text_input(&form, "mes", &e.month.label()),
            amount_input(&form, "incremento", e.increment),
            euro(e.accumulated),
            row_actions("/evolucion", e.id, &form),
        );
    }
    body.push_str("</table>");

    layout("Evolución de la Bolsa", flash, &body)
}

fn kind_select(form: &str, current: &PrepaidKind) -> String {
    let mut out = format!(r#"<select form="{form}" name="tipo">"#);
    let mut known = false;
    for kind in [
        PrepaidKind::Balance,
        PrepaidKind::Consumption,
        PrepaidKind::Prebilled,
    ] {
        let selected = if &kind == current {
            known = true;
            " selected"
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<option value="{0}"{selected}>{0}</option>"#,
            kind.as_str()
        );
    }
    if !known {
        let raw = escape(current.as_str());
        let _ = write!(out, r#"<option value="{raw}" selected>{raw}</option>"#);
    }
    out.push_str("</select>");
    out
}

pub fn prepagado_page(
    entries: &[PrepaidEntry],
    summary: &PrepaidSummary,
    flash: Option<&Flash>,
) -> String {
    let mut body = String::new();

    body.push_str("<h2>Resumen por bolsa</h2><table><tr><th>Bolsa</th><th>Saldo</th><th>Consumo</th><th>Prefacturado</th><th>Restante</th></tr>");
    for (name, totals) in &summary.buckets {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(name),
            euro(totals.balance),
            euro(totals.consumption),
            euro(totals.prebilled),
            euro_or_overflow(totals.remaining()),
        );
    }
    let _ = write!(
        body,
        "<tr><th colspan=\"4\">Total general</th><th>{}</th></tr></table>",
        euro_or_overflow(summary.total_general())
    );

    body.push_str("<h2>Movimientos</h2><table><tr><th>Bolsa</th><th>Concepto</th><th>Mes</th><th>Tipo</th><th>Importe</th><th></th></tr>");
    let new = "new-prepagado";
    let _ = write!(
        body,
        r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><form id="{new}" method="post" action="/prepagado/new"></form><button form="{new}" type="submit">Añadir</button></td></tr>"#,
        text_input(new, "bolsa", ""),
        text_input(new, "concepto", ""),
        text_input(new, "mes", ""),
        kind_select(new, &PrepaidKind::default()),
        amount_input(new, "importe", Decimal::ZERO),
    );

    for e in entries {
        let form = format!("prepagado-{}", e.id);
        let v = &e.values;
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            text_input(&form, "bolsa", &v.bucket),
            text_input(&form, "concepto", &v.concept),
            text_input(&form, "mes", &v.month_label),
            kind_select(&form, &v.kind),
            amount_input(&form, "importe", v.amount),
            row_actions("/prepagado", e.id, &form),
        );
    }
    body.push_str("</table>");

    layout("Prepagado", flash, &body)
}

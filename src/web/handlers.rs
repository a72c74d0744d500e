use super::AppState;
use super::error::AppResult;
use super::flash::{CLEAR_COOKIE, Flash, Level};
use super::forms::{EvolucionForm, PeriodQuery, PrepaidForm, RecomputeForm, RecordForm};
use super::views;
use crate::dashboard::{self, PeriodFilter};
use crate::db::{EVOLUCION_KIND, Order, PREPAID_KIND, RECORD_KIND, Session};
use crate::domain::{EvolucionRow, SerieRow};
use crate::error::{Error, Result};
use crate::month::MonthRange;
use crate::{ledger, prepaid, report};
use axum::Json;
use axum::extract::{Form, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Local;

const RECORDS: &str = "/records";
const EVOLUCION: &str = "/evolucion";
const PREPAGADO: &str = "/prepagado";

/// Renders a page with the pending flash (if any) and clears its cookie.
fn page(
    state: &AppState,
    headers: &HeaderMap,
    render: impl FnOnce(Option<&Flash>) -> String,
) -> Response {
    let flash = state.flash.read(headers);
    let html = Html(render(flash.as_ref()));
    match flash {
        Some(_) => ([(SET_COOKIE, HeaderValue::from_static(CLEAR_COOKIE))], html).into_response(),
        None => html.into_response(),
    }
}

fn redirect(state: &AppState, to: &str, flash: &Flash) -> Response {
    let mut response = Redirect::to(to).into_response();
    if let Some(cookie) = state.flash.set_cookie(flash) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Outcome of a form post: success and user mistakes both redirect back to
/// the list page with a banner; anything else becomes an error response.
fn after_mutation<T>(
    state: &AppState,
    to: &str,
    result: Result<T>,
    success: Flash,
) -> AppResult<Response> {
    match result {
        Ok(_) => Ok(redirect(state, to, &success)),
        Err(err) if err.is_user_input() => {
            tracing::info!(error = %err, path = to, "form rejected");
            Ok(redirect(
                state,
                to,
                &Flash::new(Level::Danger, err.to_string()),
            ))
        }
        Err(err) => Err(err.into()),
    }
}

fn ensure_exists<T>(found: Option<T>, kind: &'static str, id: i64) -> Result<T> {
    found.ok_or(Error::NotFound { kind, id })
}

// --- dashboard ---

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let filter = PeriodFilter::from_query(query.desde.as_deref(), query.hasta.as_deref());
    let data = state
        .db
        .run(move |s: &Session<'_>| dashboard::load(s, filter))
        .await?;
    Ok(page(&state, &headers, |flash| {
        views::dashboard_page(&data, flash)
    }))
}

pub async fn informe_pdf(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Response> {
    let filter = PeriodFilter::from_query(query.desde.as_deref(), query.hasta.as_deref());
    let now = Local::now().naive_local();
    let report = state
        .db
        .run(move |s: &Session<'_>| report::generate(s, filter, now))
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", report.filename);
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        report.bytes,
    )
        .into_response())
}

pub async fn api_serie(State(state): State<AppState>) -> AppResult<Json<Vec<SerieRow>>> {
    let records = state
        .db
        .run(|s: &Session<'_>| s.list_records(&MonthRange::all(), Order::Ascending))
        .await?;
    let rows = records
        .iter()
        .map(SerieRow::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(rows))
}

pub async fn api_evolucion(State(state): State<AppState>) -> AppResult<Json<Vec<EvolucionRow>>> {
    let entries = state
        .db
        .run(|s: &Session<'_>| s.list_evolucion(&MonthRange::all(), Order::Ascending))
        .await?;
    Ok(Json(entries.iter().map(EvolucionRow::from).collect()))
}

// --- monthly records ---

pub async fn records_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let records = state
        .db
        .run(|s: &Session<'_>| s.list_records(&MonthRange::all(), Order::Descending))
        .await?;
    Ok(page(&state, &headers, |flash| {
        views::records_page(&records, flash)
    }))
}

pub async fn records_new(
    State(state): State<AppState>,
    Form(form): Form<RecordForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| {
            let (month, input) = parsed?;
            s.insert_record(month, &input)
        })
        .await;
    after_mutation(
        &state,
        RECORDS,
        result,
        Flash::new(Level::Success, "Mes añadido correctamente"),
    )
}

pub async fn records_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<RecordForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| {
            ensure_exists(s.get_record(id)?, RECORD_KIND, id)?;
            let (month, input) = parsed?;
            s.update_record(id, month, &input)
        })
        .await;
    after_mutation(
        &state,
        RECORDS,
        result,
        Flash::new(Level::Success, "Mes actualizado"),
    )
}

pub async fn records_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let result = state
        .db
        .run(move |s: &Session<'_>| s.delete_record(id))
        .await;
    after_mutation(&state, RECORDS, result, Flash::new(Level::Info, "Mes eliminado"))
}

// --- evolución de la bolsa ---

pub async fn evolucion_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let entries = state
        .db
        .run(|s: &Session<'_>| s.list_evolucion(&MonthRange::all(), Order::Descending))
        .await?;
    Ok(page(&state, &headers, |flash| {
        views::evolucion_page(&entries, flash)
    }))
}

pub async fn evolucion_new(
    State(state): State<AppState>,
    Form(form): Form<EvolucionForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| {
            let (month, increment) = parsed?;
            ledger::create_entry(s, month, increment)
        })
        .await;
    after_mutation(
        &state,
        EVOLUCION,
        result,
        Flash::new(Level::Success, "Entrada añadida con acumulado calculado"),
    )
}

pub async fn evolucion_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<EvolucionForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| {
            ensure_exists(s.get_evolucion(id)?, EVOLUCION_KIND, id)?;
            let (month, increment) = parsed?;
            ledger::update_entry(s, id, month, increment)
        })
        .await;
    after_mutation(
        &state,
        EVOLUCION,
        result,
        Flash::new(Level::Success, "Entrada actualizada con acumulado recalculado"),
    )
}

pub async fn evolucion_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let result = state
        .db
        .run(move |s: &Session<'_>| ledger::delete_entry(s, id))
        .await;
    after_mutation(
        &state,
        EVOLUCION,
        result,
        Flash::new(Level::Info, "Entrada eliminada"),
    )
}

pub async fn evolucion_recompute(
    State(state): State<AppState>,
    Form(form): Form<RecomputeForm>,
) -> AppResult<Response> {
    let from = form.from_month();
    let result = state
        .db
        .run(move |s: &Session<'_>| ledger::rebuild_from(s, from?))
        .await;
    let message = match &result {
        Ok(changed) => format!("Acumulados recalculados ({changed} entradas actualizadas)"),
        Err(_) => String::new(),
    };
    after_mutation(
        &state,
        EVOLUCION,
        result,
        Flash::new(Level::Success, message),
    )
}

// --- prepagado ---

pub async fn prepagado_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let entries = state
        .db
        .run(|s: &Session<'_>| s.list_prepaid())
        .await?;
    let summary = prepaid::summarize(&entries)?;
    Ok(page(&state, &headers, |flash| {
        views::prepagado_page(&entries, &summary, flash)
    }))
}

pub async fn prepagado_new(
    State(state): State<AppState>,
    Form(form): Form<PrepaidForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| s.insert_prepaid(&parsed?))
        .await;
    after_mutation(
        &state,
        PREPAGADO,
        result,
        Flash::new(Level::Success, "Registro añadido correctamente"),
    )
}

pub async fn prepagado_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<PrepaidForm>,
) -> AppResult<Response> {
    let parsed = form.parse();
    let result = state
        .db
        .run(move |s: &Session<'_>| {
            ensure_exists(s.get_prepaid(id)?, PREPAID_KIND, id)?;
            s.update_prepaid(id, &parsed?)
        })
        .await;
    after_mutation(
        &state,
        PREPAGADO,
        result,
        Flash::new(Level::Success, "Registro actualizado correctamente"),
    )
}

pub async fn prepagado_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let result = state
        .db
        .run(move |s: &Session<'_>| s.delete_prepaid(id))
        .await;
    after_mutation(
        &state,
        PREPAGADO,
        result,
        Flash::new(Level::Info, "Registro eliminado"),
    )
}

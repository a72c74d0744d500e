use crate::config::{DatabaseLocation, ensure_parent_dir};
use crate::domain::{
    EvolucionEntry, MonthlyRecord, PrepaidEntry, PrepaidInput, PrepaidKind, RecordInput,
};
use crate::error::{Error, Result};
use crate::month::{Month, MonthRange};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::{Arc, Mutex, PoisonError};

const RECORD_COLUMNS: &str = "id, mes, forecast_1, facturado_2, pdt_incurrir_3, inc_pdte_factura_4, ajuste_fc, new_forecast, real_mas_deuda_pend, comentarios";
const EVOLUCION_COLUMNS: &str = "id, mes, incremento, acumulado";
const PREPAID_COLUMNS: &str = "id, bolsa, concepto, mes, importe, tipo";

/// Names used in not-found messages.
pub const RECORD_KIND: &str = "registro mensual";
pub const EVOLUCION_KIND: &str = "entrada de evolución";
pub const PREPAID_KIND: &str = "movimiento prepagado";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    fn sql(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// Shared handle to the SQLite store.
///
/// All reads and writes go through [`Db::transact`] (or its async wrapper
/// [`Db::run`]), which hands the caller a [`Session`] bound to one
/// transaction.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(location: &DatabaseLocation) -> Result<Self> {
        let conn = match location {
            DatabaseLocation::Memory => Connection::open_in_memory()?,
            DatabaseLocation::File(path) => {
                ensure_parent_dir(path)?;
                Connection::open(path)?
            }
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` inside one transaction: committed when `f` returns `Ok`,
    /// rolled back otherwise.
    pub fn transact<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        // A panic inside `f` drops the transaction, which rolls it back, so
        // the connection behind a poisoned lock is still consistent.
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let session = Session {
            tx: conn.transaction()?,
        };
        let out = f(&session)?;
        session.tx.commit()?;
        Ok(out)
    }

    /// [`Db::transact`] on the blocking thread pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Session<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.transact(f)).await?
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS monthly_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mes TEXT NOT NULL UNIQUE,
            forecast_1 TEXT NOT NULL DEFAULT '0',
            facturado_2 TEXT NOT NULL DEFAULT '0',
            pdt_incurrir_3 TEXT NOT NULL DEFAULT '0',
            inc_pdte_factura_4 TEXT NOT NULL DEFAULT '0',
            ajuste_fc TEXT NOT NULL DEFAULT '0',
            new_forecast TEXT NOT NULL DEFAULT '0',
            real_mas_deuda_pend TEXT NOT NULL DEFAULT '0',
            comentarios TEXT
        );

        CREATE TABLE IF NOT EXISTS evolucion_bolsa (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mes TEXT NOT NULL UNIQUE,
            incremento TEXT NOT NULL DEFAULT '0',
            acumulado TEXT NOT NULL DEFAULT '0'
        );

        CREATE TABLE IF NOT EXISTS prepagado (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bolsa TEXT NOT NULL,
            concepto TEXT,
            mes TEXT,
            importe TEXT NOT NULL DEFAULT '0',
            tipo TEXT NOT NULL DEFAULT 'consumo'
        );

        CREATE INDEX IF NOT EXISTS idx_prepagado_bolsa ON prepagado(bolsa);
        "#,
    )?;
    Ok(())
}

/// A transaction-scoped view of the store.
pub struct Session<'conn> {
    tx: Transaction<'conn>,
}

impl Session<'_> {
    // --- monthly_records ---

    pub fn insert_record(&self, month: Month, input: &RecordInput) -> Result<i64> {
        self.tx
            .execute(
                r#"
                INSERT INTO monthly_records (mes, forecast_1, facturado_2, pdt_incurrir_3, inc_pdte_factura_4,
                                             ajuste_fc, new_forecast, real_mas_deuda_pend, comentarios)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    month,
                    input.forecast.to_string(),
                    input.billed.to_string(),
                    input.pending_to_incur.to_string(),
                    input.pending_invoice.to_string(),
                    input.adjustment.to_string(),
                    input.new_forecast.to_string(),
                    input.real_plus_pending_debt.to_string(),
                    input.comment,
                ],
            )
            .map_err(|e| unique_or("monthly_records", month, e))?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn update_record(&self, id: i64, month: Month, input: &RecordInput) -> Result<()> {
        let changed = self
            .tx
            .execute(
                r#"
                UPDATE monthly_records
                SET mes = ?2, forecast_1 = ?3, facturado_2 = ?4, pdt_incurrir_3 = ?5, inc_pdte_factura_4 = ?6,
                    ajuste_fc = ?7, new_forecast = ?8, real_mas_deuda_pend = ?9, comentarios = ?10
                WHERE id = ?1
                "#,
                params![
                    id,
                    month,
                    input.forecast.to_string(),
                    input.billed.to_string(),
                    input.pending_to_incur.to_string(),
                    input.pending_invoice.to_string(),
                    input.adjustment.to_string(),
                    input.new_forecast.to_string(),
                    input.real_plus_pending_debt.to_string(),
                    input.comment,
                ],
            )
            .map_err(|e| unique_or("monthly_records", month, e))?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: RECORD_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn delete_record(&self, id: i64) -> Result<()> {
        let changed = self
            .tx
            .execute("DELETE FROM monthly_records WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: RECORD_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn get_record(&self, id: i64) -> Result<Option<MonthlyRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM monthly_records WHERE id = ?1");
        let raw = self
            .tx
            .query_row(&sql, params![id], RawRecord::read)
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    pub fn find_record_by_month(&self, month: Month) -> Result<Option<MonthlyRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM monthly_records WHERE mes = ?1");
        let raw = self
            .tx
            .query_row(&sql, params![month], RawRecord::read)
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    pub fn list_records(&self, range: &MonthRange, order: Order) -> Result<Vec<MonthlyRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM monthly_records
            WHERE (?1 IS NULL OR mes >= ?1)
              AND (?2 IS NULL OR mes <= ?2)
            ORDER BY mes {}
            "#,
            order.sql()
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![range.from, range.to], RawRecord::read)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    // --- evolucion_bolsa ---

    pub fn insert_evolucion(
        &self,
        month: Month,
        increment: Decimal,
        accumulated: Decimal,
    ) -> Result<i64> {
        self.tx
            .execute(
                "INSERT INTO evolucion_bolsa (mes, incremento, acumulado) VALUES (?1, ?2, ?3)",
                params![month, increment.to_string(), accumulated.to_string()],
            )
            .map_err(|e| unique_or("evolucion_bolsa", month, e))?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn update_evolucion(
        &self,
        id: i64,
        month: Month,
        increment: Decimal,
        accumulated: Decimal,
    ) -> Result<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE evolucion_bolsa SET mes = ?2, incremento = ?3, acumulado = ?4 WHERE id = ?1",
                params![id, month, increment.to_string(), accumulated.to_string()],
            )
            .map_err(|e| unique_or("evolucion_bolsa", month, e))?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: EVOLUCION_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn delete_evolucion(&self, id: i64) -> Result<()> {
        let changed = self
            .tx
            .execute("DELETE FROM evolucion_bolsa WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: EVOLUCION_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn get_evolucion(&self, id: i64) -> Result<Option<EvolucionEntry>> {
        let sql = format!("SELECT {EVOLUCION_COLUMNS} FROM evolucion_bolsa WHERE id = ?1");
        let raw = self
            .tx
            .query_row(&sql, params![id], RawEvolucion::read)
            .optional()?;
        raw.map(RawEvolucion::into_entry).transpose()
    }

    pub fn find_evolucion_by_month(&self, month: Month) -> Result<Option<EvolucionEntry>> {
        let sql = format!("SELECT {EVOLUCION_COLUMNS} FROM evolucion_bolsa WHERE mes = ?1");
        let raw = self
            .tx
            .query_row(&sql, params![month], RawEvolucion::read)
            .optional()?;
        raw.map(RawEvolucion::into_entry).transpose()
    }

    pub fn list_evolucion(&self, range: &MonthRange, order: Order) -> Result<Vec<EvolucionEntry>> {
        let sql = format!(
            r#"
            SELECT {EVOLUCION_COLUMNS}
            FROM evolucion_bolsa
            WHERE (?1 IS NULL OR mes >= ?1)
              AND (?2 IS NULL OR mes <= ?2)
            ORDER BY mes {}
            "#,
            order.sql()
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![range.from, range.to], RawEvolucion::read)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_entry()?);
        }
        Ok(out)
    }

    // --- prepagado ---

    pub fn insert_prepaid(&self, input: &PrepaidInput) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO prepagado (bolsa, concepto, mes, importe, tipo) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.bucket,
                input.concept,
                input.month_label,
                input.amount.to_string(),
                input.kind.as_str(),
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn update_prepaid(&self, id: i64, input: &PrepaidInput) -> Result<()> {
        let changed = self.tx.execute(
            "UPDATE prepagado SET bolsa = ?2, concepto = ?3, mes = ?4, importe = ?5, tipo = ?6 WHERE id = ?1",
            params![
                id,
                input.bucket,
                input.concept,
                input.month_label,
                input.amount.to_string(),
                input.kind.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: PREPAID_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn delete_prepaid(&self, id: i64) -> Result<()> {
        let changed = self
            .tx
            .execute("DELETE FROM prepagado WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound {
                kind: PREPAID_KIND,
                id,
            });
        }
        Ok(())
    }

    pub fn get_prepaid(&self, id: i64) -> Result<Option<PrepaidEntry>> {
        let sql = format!("SELECT {PREPAID_COLUMNS} FROM prepagado WHERE id = ?1");
        let raw = self
            .tx
            .query_row(&sql, params![id], RawPrepaid::read)
            .optional()?;
        raw.map(RawPrepaid::into_entry).transpose()
    }

    /// All entries, ordered by bucket then id.
    pub fn list_prepaid(&self) -> Result<Vec<PrepaidEntry>> {
        let sql = format!("SELECT {PREPAID_COLUMNS} FROM prepagado ORDER BY bolsa ASC, id ASC");
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map([], RawPrepaid::read)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_entry()?);
        }
        Ok(out)
    }
}

fn unique_or(table: &'static str, month: Month, err: rusqlite::Error) -> Error {
    let constraint = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    );
    if constraint {
        Error::DuplicateMonth { table, month }
    } else {
        Error::Sqlite(err)
    }
}

/// Amount columns are TEXT, but rows written by other tools may hold
/// numbers or NULL; NULL reads as zero.
fn decimal_value(value: Value, table: &'static str, column: &'static str) -> Result<Decimal> {
    let corrupt = |value: String| Error::Corrupt {
        table,
        column,
        value,
    };
    match value {
        Value::Null => Ok(Decimal::ZERO),
        Value::Integer(i) => Ok(Decimal::from(i)),
        Value::Real(f) => Decimal::from_f64(f).ok_or_else(|| corrupt(f.to_string())),
        Value::Text(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Value::Text(s) => s.trim().parse::<Decimal>().map_err(|_| corrupt(s)),
        Value::Blob(_) => Err(corrupt("<blob>".to_string())),
    }
}

struct RawRecord {
    id: i64,
    month: Month,
    amounts: [Value; 7],
    comment: Option<String>,
}

impl RawRecord {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            month: row.get(1)?,
            amounts: [
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ],
            comment: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<MonthlyRecord> {
        const COLUMNS: [&str; 7] = [
            "forecast_1",
            "facturado_2",
            "pdt_incurrir_3",
            "inc_pdte_factura_4",
            "ajuste_fc",
            "new_forecast",
            "real_mas_deuda_pend",
        ];
        let mut parsed = [Decimal::ZERO; 7];
        for (i, value) in self.amounts.into_iter().enumerate() {
            parsed[i] = decimal_value(value, "monthly_records", COLUMNS[i])?;
        }
        let [
            forecast,
            billed,
            pending_to_incur,
            pending_invoice,
            adjustment,
            new_forecast,
            real_plus_pending_debt,
        ] = parsed;

        Ok(MonthlyRecord {
            id: self.id,
            month: self.month,
            values: RecordInput {
                forecast,
                billed,
                pending_to_incur,
                pending_invoice,
                adjustment,
                new_forecast,
                real_plus_pending_debt,
                comment: self.comment,
            },
        })
    }
}

struct RawEvolucion {
    id: i64,
    month: Month,
    increment: Value,
    accumulated: Value,
}

impl RawEvolucion {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            month: row.get(1)?,
            increment: row.get(2)?,
            accumulated: row.get(3)?,
        })
    }

    fn into_entry(self) -> Result<EvolucionEntry> {
        Ok(EvolucionEntry {
            id: self.id,
            month: self.month,
            increment: decimal_value(self.increment, "evolucion_bolsa", "incremento")?,
            accumulated: decimal_value(self.accumulated, "evolucion_bolsa", "acumulado")?,
        })
    }
}

struct RawPrepaid {
    id: i64,
    bucket: String,
    concept: Option<String>,
    month_label: Option<String>,
    amount: Value,
    kind: String,
}

impl RawPrepaid {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bucket: row.get(1)?,
            concept: row.get(2)?,
            month_label: row.get(3)?,
            amount: row.get(4)?,
            kind: row.get(5)?,
        })
    }

    fn into_entry(self) -> Result<PrepaidEntry> {
        Ok(PrepaidEntry {
            id: self.id,
            values: PrepaidInput {
                bucket: self.bucket,
                concept: self.concept.unwrap_or_default(),
                month_label: self.month_label.unwrap_or_default(),
                amount: decimal_value(self.amount, "prepagado", "importe")?,
                kind: PrepaidKind::parse(&self.kind),
            },
        })
    }
}

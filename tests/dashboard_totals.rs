use control_economico::config::DatabaseLocation;
use control_economico::dashboard::{self, DashboardSummary, PeriodFilter};
use control_economico::db::{Db, Order};
use control_economico::domain::{MonthlyRecord, PrepaidInput, PrepaidKind, RecordInput, parse_amount};
use control_economico::error::Error;
use control_economico::month::{Month, MonthRange};
use rust_decimal::Decimal;
use tempfile::TempDir;

fn m(year: i32, month: u32) -> Month {
    Month::new(year, month).expect("month")
}

fn record(forecast: i64, billed: i64, to_incur: i64, invoice: i64) -> RecordInput {
    RecordInput {
        forecast: Decimal::from(forecast),
        billed: Decimal::from(billed),
        pending_to_incur: Decimal::from(to_incur),
        pending_invoice: Decimal::from(invoice),
        ..RecordInput::default()
    }
}

#[test]
fn remaining_is_billed_plus_pending_minus_forecast() {
    let db = Db::open_in_memory().expect("db");
    let id = db
        .transact(|s| s.insert_record(m(2025, 4), &record(1000, 600, 100, 50)))
        .expect("insert");

    let row: MonthlyRecord = db
        .transact(|s| s.get_record(id))
        .expect("get")
        .expect("row exists");
    assert_eq!(row.remaining().expect("remaining"), Decimal::from(-250));
    assert_eq!(row.pending().expect("pending"), Decimal::from(150));
}

#[test]
fn summary_identities_hold_for_any_row_set() {
    let sets: Vec<Vec<RecordInput>> = vec![
        vec![],
        vec![record(1000, 600, 100, 50)],
        vec![record(10, 20, 0, 0), record(-5, 7, 3, 4), record(0, 0, 0, 0)],
    ];
    for (i, inputs) in sets.into_iter().enumerate() {
        let records: Vec<MonthlyRecord> = inputs
            .into_iter()
            .enumerate()
            .map(|(j, values)| MonthlyRecord {
                id: j as i64 + 1,
                month: m(2025, j as u32 + 1),
                values,
            })
            .collect();
        let prepaid = Decimal::from(i as i64 * 100);
        let s = DashboardSummary::new(&records, prepaid).expect("summary");

        let forecast: Decimal = records.iter().map(|r| r.values.forecast).sum();
        let billed: Decimal = records.iter().map(|r| r.values.billed).sum();
        let pending: Decimal = records
            .iter()
            .map(|r| r.pending().expect("pending"))
            .sum();
        assert_eq!(s.wip, forecast - billed);
        assert_eq!(s.wip_total, s.wip + prepaid);
        assert_eq!(s.wip_calculated, s.wip_total - pending);
    }

    let empty = DashboardSummary::new(&[], Decimal::ZERO).expect("empty summary");
    assert_eq!(empty, DashboardSummary::default());
}

#[test]
fn load_filters_by_period_and_adds_the_prepaid_total() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        s.insert_record(m(2025, 3), &record(9000, 0, 0, 0))?;
        s.insert_record(m(2025, 4), &record(1000, 600, 100, 50))?;
        s.insert_record(m(2025, 5), &record(500, 100, 0, 0))?;
        s.insert_record(m(2025, 6), &record(700, 700, 0, 0))?;
        s.insert_evolucion(m(2025, 5), Decimal::from(200), Decimal::from(201))?;
        s.insert_prepaid(&PrepaidInput {
            bucket: "Samsung".into(),
            amount: Decimal::from(1000),
            kind: PrepaidKind::Balance,
            ..PrepaidInput::default()
        })?;
        Ok(())
    })
    .expect("seed");

    let data = db
        .transact(|s| dashboard::load(s, PeriodFilter::from_query(None, Some("2025-05"))))
        .expect("load");

    assert_eq!(data.filter.desde, "2025-04");
    let months: Vec<String> = data.records.iter().map(|r| r.month.label()).collect();
    assert_eq!(months, vec!["2025-04", "2025-05"]);
    assert_eq!(data.evolucion.len(), 1);

    let s = data.summary;
    assert_eq!(s.total_forecast, Decimal::from(1500));
    assert_eq!(s.total_billed, Decimal::from(700));
    assert_eq!(s.total_pending, Decimal::from(150));
    assert_eq!(s.wip, Decimal::from(800));
    assert_eq!(s.total_prepaid, Decimal::from(1000));
    assert_eq!(s.wip_total, Decimal::from(1800));
    assert_eq!(s.wip_calculated, Decimal::from(1650));
}

#[test]
fn totals_that_overflow_are_a_user_error_not_a_panic() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        let max = RecordInput {
            forecast: Decimal::MAX,
            ..RecordInput::default()
        };
        s.insert_record(m(2025, 4), &max)?;
        s.insert_record(m(2025, 5), &max)?;
        Ok(())
    })
    .expect("seed");

    let err = db
        .transact(|s| dashboard::load(s, PeriodFilter::from_query(None, None)))
        .expect_err("overflow");
    assert!(matches!(err, Error::AmountOutOfRange("total forecast")));
    assert!(err.is_user_input());

    // The handle is still usable afterwards.
    let rows = db
        .transact(|s| s.list_records(&MonthRange::all(), Order::Ascending))
        .expect("list");
    assert_eq!(rows.len(), 2);
}

#[test]
fn unreadable_prepaid_table_counts_as_zero() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("control.db");
    let db = Db::open(&DatabaseLocation::File(path.clone())).expect("db");
    db.transact(|s| {
        s.insert_record(m(2025, 4), &record(1000, 600, 100, 50))?;
        s.insert_prepaid(&PrepaidInput {
            bucket: "Samsung".into(),
            amount: Decimal::from(1000),
            kind: PrepaidKind::Balance,
            ..PrepaidInput::default()
        })?;
        Ok(())
    })
    .expect("seed");
    let load = || {
        db.transact(|s| dashboard::load(s, PeriodFilter::from_query(None, None)))
            .expect("load")
    };
    assert_eq!(load().summary.total_prepaid, Decimal::from(1000));

    let other = rusqlite::Connection::open(&path).expect("second connection");
    other
        .execute_batch("UPDATE prepagado SET importe = 'mil'")
        .expect("corrupt importe");
    let data = load();
    assert_eq!(data.summary.total_prepaid, Decimal::ZERO);
    assert_eq!(data.summary.wip_total, Decimal::from(400));

    other
        .execute_batch("DROP TABLE prepagado")
        .expect("drop table");
    let data = load();
    assert_eq!(data.summary.total_prepaid, Decimal::ZERO);
    assert_eq!(data.summary.total_forecast, Decimal::from(1000));
    assert_eq!(data.records.len(), 1);
}

#[test]
fn period_filter_defaults_and_invalid_bounds() {
    let f = PeriodFilter::from_query(Some(""), None);
    assert_eq!(f.desde, "2025-04");
    assert_eq!(f.range.from, Month::new(2025, 4));
    assert_eq!(f.range.to, None);

    // Not YYYY-MM: echoed back but the bound stays open.
    let f = PeriodFilter::from_query(Some("abril"), Some("2025-13"));
    assert_eq!(f.desde, "abril");
    assert_eq!(f.range.from, None);
    assert_eq!(f.range.to, None);
}

#[test]
fn form_amounts_are_lenient() {
    assert_eq!(parse_amount(Some("12.50")), Decimal::new(1250, 2));
    assert_eq!(parse_amount(Some(" 7 ")), Decimal::from(7));
    assert_eq!(parse_amount(Some("1e3")), Decimal::from(1000));
    assert_eq!(parse_amount(Some("doce")), Decimal::ZERO);
    assert_eq!(parse_amount(Some("")), Decimal::ZERO);
    assert_eq!(parse_amount(None), Decimal::ZERO);
}

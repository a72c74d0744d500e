use control_economico::db::{Db, Order};
use control_economico::error::Error;
use control_economico::ledger::{
    self, CREATE_OFFSET, accumulated_on_create, accumulated_on_edit,
};
use control_economico::month::{Month, MonthRange};
use rust_decimal::Decimal;

fn m(year: i32, month: u32) -> Month {
    Month::new(year, month).expect("month")
}

fn d(value: i64) -> Decimal {
    Decimal::from(value)
}

#[test]
fn create_without_predecessor_starts_from_zero_plus_offset() {
    let db = Db::open_in_memory().expect("db");

    let entry = db
        .transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create");

    assert_eq!(entry.accumulated, d(201));
}

#[test]
fn create_chains_from_the_previous_calendar_month() {
    let db = Db::open_in_memory().expect("db");

    db.transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create may");
    let june = db
        .transact(|s| ledger::create_entry(s, m(2025, 6), d(50)))
        .expect("create june");

    // 201 + 50 + 1
    assert_eq!(june.accumulated, d(252));
}

#[test]
fn a_gap_in_months_restarts_the_chain() {
    let db = Db::open_in_memory().expect("db");

    db.transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create may");
    // No June row: July does not see May.
    let july = db
        .transact(|s| ledger::create_entry(s, m(2025, 7), d(30)))
        .expect("create july");

    assert_eq!(july.accumulated, d(31));
}

#[test]
fn edit_recomputes_without_the_create_offset() {
    let db = Db::open_in_memory().expect("db");

    db.transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create may");
    let june = db
        .transact(|s| ledger::create_entry(s, m(2025, 6), d(50)))
        .expect("create june");
    assert_eq!(june.accumulated, d(252));

    // Same increment, but the edit path drops the +1.
    let edited = db
        .transact(|s| ledger::update_entry(s, june.id, m(2025, 6), d(50)))
        .expect("edit june");

    assert_eq!(edited.accumulated, d(251));
    assert_eq!(june.accumulated - edited.accumulated, CREATE_OFFSET);
}

#[test]
fn create_and_edit_formulas_differ_by_the_offset() {
    for (prev, inc) in [(d(0), d(0)), (d(201), d(50)), (d(-40), d(15))] {
        let created = accumulated_on_create(prev, inc).expect("create formula");
        let edited = accumulated_on_edit(prev, inc).expect("edit formula");
        assert_eq!(created - edited, Decimal::ONE);
        assert_eq!(edited, prev + inc);
    }
}

#[test]
fn accumulated_overflow_is_rejected_without_storing_a_row() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| s.insert_evolucion(m(2025, 5), d(0), Decimal::MAX))
        .expect("seed may");

    let err = db
        .transact(|s| ledger::create_entry(s, m(2025, 6), d(1)))
        .expect_err("overflow");
    assert!(matches!(err, Error::AmountOutOfRange("acumulado")));
    assert!(err.is_user_input());
    assert!(accumulated_on_edit(Decimal::MAX, d(1)).is_err());
    assert!(accumulated_on_create(Decimal::MAX, d(0)).is_err());

    let june = db
        .transact(|s| s.find_evolucion_by_month(m(2025, 6)))
        .expect("find");
    assert!(june.is_none());
}

#[test]
fn a_panic_inside_a_transaction_leaves_the_handle_usable() {
    let db = Db::open_in_memory().expect("db");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        db.transact(|s| -> Result<(), Error> {
            ledger::create_entry(s, m(2025, 5), d(200))?;
            panic!("boom")
        })
    }));
    assert!(outcome.is_err());

    let entries = db
        .transact(|s| s.list_evolucion(&MonthRange::all(), Order::Ascending))
        .expect("list after panic");
    assert!(entries.is_empty());

    let entry = db
        .transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create after panic");
    assert_eq!(entry.accumulated, d(201));
}

#[test]
fn edits_and_deletes_do_not_cascade_to_later_months() {
    let db = Db::open_in_memory().expect("db");

    let may = db
        .transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create may");
    db.transact(|s| ledger::create_entry(s, m(2025, 6), d(50)))
        .expect("create june");

    db.transact(|s| ledger::update_entry(s, may.id, m(2025, 5), d(1000)))
        .expect("edit may");
    let june = db
        .transact(|s| s.find_evolucion_by_month(m(2025, 6)))
        .expect("find")
        .expect("june exists");
    assert_eq!(june.accumulated, d(252));

    db.transact(|s| ledger::delete_entry(s, may.id))
        .expect("delete may");
    let june = db
        .transact(|s| s.find_evolucion_by_month(m(2025, 6)))
        .expect("find")
        .expect("june exists");
    assert_eq!(june.accumulated, d(252));
}

#[test]
fn rebuild_walks_forward_with_the_edit_formula() {
    let db = Db::open_in_memory().expect("db");

    for (month, inc) in [(m(2025, 4), 100), (m(2025, 5), 200), (m(2025, 6), 50)] {
        db.transact(|s| ledger::create_entry(s, month, d(inc)))
            .expect("create");
    }

    let changed = db
        .transact(|s| ledger::rebuild_from(s, Some(m(2025, 5))))
        .expect("rebuild");
    assert_eq!(changed, 2);

    let entries = db
        .transact(|s| s.list_evolucion(&MonthRange::all(), Order::Ascending))
        .expect("list");
    let acc: Vec<Decimal> = entries.iter().map(|e| e.accumulated).collect();
    // April keeps its create offset; May and June chain from it.
    assert_eq!(acc, vec![d(101), d(301), d(351)]);

    let changed = db
        .transact(|s| ledger::rebuild_from(s, None))
        .expect("rebuild all");
    assert_eq!(changed, 3);
    let entries = db
        .transact(|s| s.list_evolucion(&MonthRange::all(), Order::Ascending))
        .expect("list");
    let acc: Vec<Decimal> = entries.iter().map(|e| e.accumulated).collect();
    assert_eq!(acc, vec![d(100), d(300), d(350)]);
}

#[test]
fn duplicate_months_and_unknown_ids_are_errors() {
    let db = Db::open_in_memory().expect("db");

    db.transact(|s| ledger::create_entry(s, m(2025, 5), d(200)))
        .expect("create");
    let dup = db.transact(|s| ledger::create_entry(s, m(2025, 5), d(1)));
    assert!(matches!(dup, Err(Error::DuplicateMonth { .. })));
    assert!(dup.expect_err("duplicate").is_user_input());

    let missing = db.transact(|s| ledger::update_entry(s, 999, m(2025, 8), d(1)));
    assert!(matches!(missing, Err(Error::NotFound { id: 999, .. })));

    let missing = db.transact(|s| ledger::delete_entry(s, 999));
    assert!(matches!(missing, Err(Error::NotFound { id: 999, .. })));
}

#[test]
fn failed_transactions_roll_back() {
    let db = Db::open_in_memory().expect("db");

    let result: Result<(), Error> = db.transact(|s| {
        ledger::create_entry(s, m(2025, 5), d(200))?;
        Err(Error::MissingField("incremento"))
    });
    assert!(result.is_err());

    let entries = db
        .transact(|s| s.list_evolucion(&MonthRange::all(), Order::Ascending))
        .expect("list");
    assert!(entries.is_empty());
}

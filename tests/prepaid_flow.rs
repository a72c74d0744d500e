use control_economico::db::Db;
use control_economico::domain::{PrepaidInput, PrepaidKind};
use control_economico::error::Error;
use control_economico::prepaid::summarize;
use rust_decimal::Decimal;

fn entry(bucket: &str, kind: PrepaidKind, amount: i64) -> PrepaidInput {
    PrepaidInput {
        bucket: bucket.to_string(),
        concept: format!("{} {}", kind.as_str(), amount),
        month_label: "mayo".to_string(),
        amount: Decimal::from(amount),
        kind,
    }
}

#[test]
fn samsung_bucket_remaining_is_balance_minus_consumption_and_prebilled() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        s.insert_prepaid(&entry("Samsung", PrepaidKind::Balance, 1000))?;
        s.insert_prepaid(&entry("Samsung", PrepaidKind::Consumption, 300))?;
        s.insert_prepaid(&entry("Samsung", PrepaidKind::Prebilled, 100))?;
        Ok(())
    })
    .expect("seed");

    let entries = db.transact(|s| s.list_prepaid()).expect("list");
    let summary = summarize(&entries).expect("summary");

    let samsung = summary.bucket("Samsung").expect("bucket");
    assert_eq!(samsung.balance, Decimal::from(1000));
    assert_eq!(samsung.consumption, Decimal::from(300));
    assert_eq!(samsung.prebilled, Decimal::from(100));
    assert_eq!(samsung.remaining().expect("remaining"), Decimal::from(600));
    assert_eq!(summary.total_general().expect("total"), Decimal::from(600));
}

#[test]
fn total_general_sums_remaining_over_buckets_and_names_are_case_sensitive() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        s.insert_prepaid(&entry("Samsung", PrepaidKind::Balance, 1000))?;
        s.insert_prepaid(&entry("samsung", PrepaidKind::Consumption, 250))?;
        s.insert_prepaid(&entry("Acme", PrepaidKind::Balance, 500))?;
        s.insert_prepaid(&entry("Acme", PrepaidKind::Prebilled, 125))?;
        Ok(())
    })
    .expect("seed");

    let entries = db.transact(|s| s.list_prepaid()).expect("list");
    // Ordered by bucket, then id.
    let buckets: Vec<&str> = entries.iter().map(|e| e.values.bucket.as_str()).collect();
    assert_eq!(buckets, vec!["Acme", "Acme", "Samsung", "samsung"]);

    let summary = summarize(&entries).expect("summary");
    assert_eq!(summary.buckets.len(), 3);
    assert_eq!(
        summary.bucket("samsung").map(|b| b.remaining().expect("remaining")),
        Some(Decimal::from(-250))
    );
    let expected: Decimal = summary
        .buckets
        .values()
        .map(|b| b.remaining().expect("remaining"))
        .sum();
    assert_eq!(summary.total_general().expect("total"), expected);
    assert_eq!(summary.total_general().expect("total"), Decimal::from(1125));
}

#[test]
fn unknown_types_open_a_bucket_but_contribute_nothing() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        s.insert_prepaid(&entry("Otros", PrepaidKind::Other("regalo".into()), 999))?;
        Ok(())
    })
    .expect("seed");

    let entries = db.transact(|s| s.list_prepaid()).expect("list");
    assert_eq!(entries[0].values.kind, PrepaidKind::Other("regalo".into()));

    let summary = summarize(&entries).expect("summary");
    assert_eq!(summary.bucket("Otros").map(|b| b.remaining().expect("remaining")), Some(Decimal::ZERO));
    assert_eq!(summary.total_general().expect("total"), Decimal::ZERO);
}

#[test]
fn bucket_sums_past_the_decimal_range_are_rejected() {
    let db = Db::open_in_memory().expect("db");
    db.transact(|s| {
        for _ in 0..2 {
            s.insert_prepaid(&PrepaidInput {
                bucket: "Samsung".into(),
                amount: Decimal::MAX,
                kind: PrepaidKind::Balance,
                ..PrepaidInput::default()
            })?;
        }
        s.insert_prepaid(&PrepaidInput {
            bucket: "Acme".into(),
            amount: Decimal::MIN,
            kind: PrepaidKind::Balance,
            ..PrepaidInput::default()
        })?;
        s.insert_prepaid(&PrepaidInput {
            bucket: "Acme".into(),
            amount: Decimal::MAX,
            kind: PrepaidKind::Consumption,
            ..PrepaidInput::default()
        })?;
        Ok(())
    })
    .expect("seed");
    let entries = db.transact(|s| s.list_prepaid()).expect("list");

    let err = summarize(&entries).expect_err("saldo overflow");
    assert!(matches!(err, Error::AmountOutOfRange(_)));
    assert!(err.is_user_input());

    // One MAX balance sums fine, but MIN minus MAX does not.
    let acme: Vec<_> = entries
        .into_iter()
        .filter(|e| e.values.bucket == "Acme")
        .collect();
    let summary = summarize(&acme).expect("acme summary");
    let bucket = summary.bucket("Acme").expect("bucket");
    assert!(matches!(bucket.remaining(), Err(Error::AmountOutOfRange(_))));
    assert!(summary.total_general().is_err());
}

#[test]
fn update_and_delete_target_one_row() {
    let db = Db::open_in_memory().expect("db");
    let id = db
        .transact(|s| s.insert_prepaid(&entry("Samsung", PrepaidKind::Consumption, 300)))
        .expect("insert");

    db.transact(|s| s.update_prepaid(id, &entry("Samsung", PrepaidKind::Consumption, 450)))
        .expect("update");
    let row = db
        .transact(|s| s.get_prepaid(id))
        .expect("get")
        .expect("row exists");
    assert_eq!(row.values.amount, Decimal::from(450));

    db.transact(|s| s.delete_prepaid(id)).expect("delete");
    assert!(db.transact(|s| s.get_prepaid(id)).expect("get").is_none());

    let again = db.transact(|s| s.delete_prepaid(id));
    assert!(matches!(again, Err(Error::NotFound { .. })));
}

#[test]
fn kind_strings_round_trip_through_parse() {
    assert_eq!(PrepaidKind::parse("saldo"), PrepaidKind::Balance);
    assert_eq!(PrepaidKind::parse("consumo"), PrepaidKind::Consumption);
    assert_eq!(PrepaidKind::parse("prefacturado"), PrepaidKind::Prebilled);
    assert_eq!(PrepaidKind::parse("Saldo"), PrepaidKind::Other("Saldo".into()));
    assert_eq!(PrepaidKind::default(), PrepaidKind::Consumption);
}

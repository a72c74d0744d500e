use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn app_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("control-economico"));
    cmd.env_remove("DATABASE_URL");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_ok(home: &tempfile::TempDir, args: &[&str]) {
    let mut cmd = app_cmd();
    cmd.env("CONTROL_ECONOMICO_HOME", home.path());
    cmd.args(args);
    cmd.assert().success();
}

fn run_ok_out(home: &tempfile::TempDir, args: &[&str]) -> String {
    let mut cmd = app_cmd();
    cmd.env("CONTROL_ECONOMICO_HOME", home.path());
    cmd.args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8 stdout")
}

/// Seeds the store under `home` through the library, the same file the binary opens.
fn seed(home: &tempfile::TempDir, f: impl FnOnce(&control_economico::db::Session<'_>)) {
    use control_economico::config::{DatabaseLocation, app_paths, default_database_path};
    use control_economico::db::Db;

    let paths = app_paths(Some(home.path().to_path_buf())).expect("paths");
    let db = Db::open(&DatabaseLocation::File(default_database_path(&paths))).expect("open db");
    db.transact(|s| {
        f(s);
        Ok(())
    })
    .expect("seed");
}

#[test]
fn init_db_creates_the_database_file() {
    let home = tempfile::tempdir().expect("tempdir");

    let out = run_ok_out(&home, &["init-db"]);

    assert!(out.contains("Database ready"));
    assert!(home.path().join("data").join("data.db").exists());
}

#[test]
fn summary_prints_totals_for_the_period() {
    use control_economico::domain::RecordInput;
    use control_economico::month::Month;
    use rust_decimal::Decimal;

    let home = tempfile::tempdir().expect("tempdir");
    seed(&home, |s| {
        let april = Month::new(2025, 4).expect("month");
        s.insert_record(
            april,
            &RecordInput {
                forecast: Decimal::from(1000),
                billed: Decimal::from(600),
                pending_to_incur: Decimal::from(100),
                pending_invoice: Decimal::from(50),
                ..RecordInput::default()
            },
        )
        .expect("insert");
        // Before the default `desde`, so excluded.
        s.insert_record(
            Month::new(2025, 3).expect("month"),
            &RecordInput {
                forecast: Decimal::from(5000),
                ..RecordInput::default()
            },
        )
        .expect("insert");
    });

    let out = run_ok_out(&home, &["summary"]);

    assert!(out.contains("period\t2025-04\tactualidad"));
    assert!(out.contains("months\t1"));
    assert!(out.contains("total_forecast\t1000\t1.000,00 €"));
    assert!(out.contains("wip\t400\t400,00 €"));
    assert!(out.contains("wip_calculado\t250\t250,00 €"));
}

#[test]
fn summary_json_is_machine_readable() {
    let home = tempfile::tempdir().expect("tempdir");
    run_ok(&home, &["init-db"]);

    let out = run_ok_out(&home, &["summary", "--json", "--desde", "2024-01"]);

    let v: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(v.get("wip").and_then(|x| x.as_f64()), Some(0.0));
    assert_eq!(v.get("total_prepaid").and_then(|x| x.as_f64()), Some(0.0));
}

#[test]
fn report_writes_a_pdf_file() {
    let home = tempfile::tempdir().expect("tempdir");
    let out_path = home.path().join("informe.pdf");

    let out = run_ok_out(
        &home,
        &["report", "--desde", "2025-01", "--out", out_path.to_str().expect("utf8 path")],
    );

    assert!(out.contains("Wrote report to"));
    let bytes = std::fs::read(&out_path).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn rebuild_ledger_repairs_create_offsets() {
    use control_economico::ledger;
    use control_economico::month::Month;
    use rust_decimal::Decimal;

    let home = tempfile::tempdir().expect("tempdir");
    seed(&home, |s| {
        ledger::create_entry(s, Month::new(2025, 5).expect("month"), Decimal::from(200))
            .expect("create");
        ledger::create_entry(s, Month::new(2025, 6).expect("month"), Decimal::from(50))
            .expect("create");
    });

    let out = run_ok_out(&home, &["rebuild-ledger"]);
    assert!(out.contains("Recomputed 2 evolucion entries."));

    let out = run_ok_out(&home, &["rebuild-ledger", "--from", "2025-05"]);
    assert!(out.contains("Recomputed 0 evolucion entries."));
}

#[test]
fn rebuild_ledger_rejects_an_invalid_month() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut cmd = app_cmd();
    cmd.env("CONTROL_ECONOMICO_HOME", home.path());
    cmd.args(["rebuild-ledger", "--from", "mayo"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Mes no válido: 'mayo'"));
}

#[test]
fn postgres_urls_are_rejected() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut cmd = app_cmd();
    cmd.env("CONTROL_ECONOMICO_HOME", home.path());
    cmd.env("DATABASE_URL", "postgresql://user@localhost/control");
    cmd.arg("init-db");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("only SQLite is supported"));
}

#[test]
fn import_reports_a_missing_workbook() {
    let home = tempfile::tempdir().expect("tempdir");
    let missing = home.path().join("nope.xlsx");
    let mut cmd = app_cmd();
    cmd.env("CONTROL_ECONOMICO_HOME", home.path());
    cmd.args(["import", "--path", missing.to_str().expect("utf8 path")]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Import from"));
}

//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::NaiveDate;
use spendwise_core::db::Database;
use spendwise_core::models::{NewExpenseItem, Registration};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.register_user(&Registration {
        email: Some("alice@example.com".to_string()),
        username: Some("alice".to_string()),
        password: Some("hunter22".to_string()),
        ..Default::default()
    })
    .unwrap();
    db.create_category("Food").unwrap();
    db
}

fn march() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Give alice a March budget and one 100.00 expense, returning her user id
fn seed_budget(db: &Database) -> i64 {
    let user = db.get_user_by_username("alice").unwrap().unwrap();
    db.create_sub_category(user.id, "Groceries", "Food").unwrap();
    db.create_budget(user.id, march(), 1000.0).unwrap();
    db.create_expense_day(
        user.id,
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        &[NewExpenseItem {
            sub_category_name: "Groceries".to_string(),
            title: "Weekly shop".to_string(),
            quantity: 2.0,
            amount: 50.0,
            currency: None,
            description: None,
        }],
    )
    .unwrap();
    user.id
}

// ========== Core Command Tests ==========

#[test]
fn test_open_db_creates_file() {
    let dir = std::env::temp_dir().join(format!("spendwise_cli_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("init.db");
    let _ = std::fs::remove_file(&path);

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path).unwrap();
    assert!(db.list_categories().unwrap().is_empty());
}

#[test]
fn test_find_user() {
    let db = setup_test_db();
    assert_eq!(commands::find_user(&db, "alice").unwrap().username, "alice");

    let err = commands::find_user(&db, "nobody").unwrap_err();
    assert!(err.to_string().contains("nobody"));
}

// ========== Category Command Tests ==========

#[test]
fn test_cmd_categories() {
    let db = setup_test_db();
    commands::cmd_categories_add(&db, "Transport").unwrap();
    assert!(commands::cmd_categories_list(&db).is_ok());

    assert!(db.get_category_by_name("Transport").unwrap().is_some());
    assert!(commands::cmd_categories_add(&db, "Transport").is_err());

    let entries = db.list_audit_log(10).unwrap();
    assert_eq!(entries[0].actor, "cli");
}

#[test]
fn test_cmd_users() {
    let db = setup_test_db();
    assert!(commands::cmd_users(&db).is_ok());
}

// ========== Budget Command Tests ==========

#[test]
fn test_cmd_budget() {
    let db = setup_test_db();
    seed_budget(&db);

    assert!(commands::cmd_budget(&db, "alice", "2024-03").is_ok());
    assert!(commands::cmd_budget(&db, "alice", "2024-04").is_err());
    assert!(commands::cmd_budget(&db, "alice", "March").is_err());
    assert!(commands::cmd_budget(&db, "bob", "2024-03").is_err());
}

#[test]
fn test_cmd_reconcile_repairs_balance() {
    let db = setup_test_db();
    let user_id = seed_budget(&db);

    let conn = db.conn().unwrap();
    conn.execute("UPDATE budgets SET current_balance = 0", [])
        .unwrap();
    drop(conn);

    commands::cmd_reconcile(&db, "alice", Some("2024-03")).unwrap();
    let budget = db.get_budget(user_id, march()).unwrap().unwrap();
    assert_eq!(budget.current_balance, 900.0);

    // Without a month every budget is reconciled
    let conn = db.conn().unwrap();
    conn.execute("UPDATE budgets SET current_balance = 0", [])
        .unwrap();
    drop(conn);

    commands::cmd_reconcile(&db, "alice", None).unwrap();
    let budget = db.get_budget(user_id, march()).unwrap().unwrap();
    assert_eq!(budget.current_balance, 900.0);

    // A month without a budget is not an error
    assert!(commands::cmd_reconcile(&db, "alice", Some("2023-01")).is_ok());
}

#[test]
fn test_cmd_audit() {
    let db = setup_test_db();
    assert!(commands::cmd_audit(&db, 10).is_ok());

    db.log_audit("alice", "list", Some("category"), None, None)
        .unwrap();
    assert!(commands::cmd_audit(&db, 10).is_ok());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long username", 10), "a very ...");
    assert_eq!(truncate("żółć-żółć", 6), "żół...");
}

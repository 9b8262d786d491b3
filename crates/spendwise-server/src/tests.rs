//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use spendwise_core::db::Database;
use spendwise_core::models::Registration;
use tower::ServiceExt;

const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

struct TestApp {
    app: Router,
    db: Database,
    token: String,
}

fn test_config() -> ServerConfig {
    ServerConfig::new(SECRET)
}

fn register(db: &Database, username: &str) -> spendwise_core::models::User {
    db.register_user(&Registration {
        email: Some(format!("{}@example.com", username)),
        username: Some(username.to_string()),
        password: Some("hunter22".to_string()),
        ..Default::default()
    })
    .unwrap()
}

/// App with user "alice", Food/Transport categories and a Groceries sub-category
fn setup_test_app() -> TestApp {
    let db = Database::in_memory().unwrap();
    let user = register(&db, "alice");
    db.create_category("Food").unwrap();
    db.create_category("Transport").unwrap();
    db.create_sub_category(user.id, "Groceries", "Food").unwrap();

    let config = test_config();
    let token = issue_token(&user, &config).unwrap();
    let app = create_router(db.clone(), None, config);

    TestApp { app, db, token }
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a request and return the status with the parsed JSON body
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, get_body_json(response).await)
}

fn groceries(quantity: f64, amount: f64) -> Value {
    json!({
        "subCategoryName": "Groceries",
        "title": "Weekly shop",
        "quantity": quantity,
        "amount": amount,
        "currency": "USD"
    })
}

// ========== Auth API Tests ==========

#[tokio::test]
async fn test_register_login_and_current_user() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, test_config());

    let (status, json) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({
            "email": "bob@example.com",
            "username": "bob",
            "password": "s3cret!",
            "firstName": "Bob"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["username"], "bob");
    assert_eq!(json["firstName"], "Bob");
    assert!(json.get("password").is_none());
    assert!(json.get("passwordHash").is_none());

    let (status, json) = send(
        &app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": "bob@example.com", "password": "s3cret!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = json["accessToken"].as_str().unwrap().to_string();
    assert_eq!(json["user"]["email"], "bob@example.com");

    let (status, json) = send(&app, "GET", "/api/users/current-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "bob");
}

#[tokio::test]
async fn test_register_missing_fields() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, test_config());

    let (status, json) = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "Please provide the required fields: username, password"
    );
}

#[tokio::test]
async fn test_login_wrong_password() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Incorrect email or password");

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users/login",
        None,
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = setup_test_app();

    let (status, json) = send(&t.app, "GET", "/api/users/category", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "User is not authorized or token is missing");

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/category",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Token signed with another secret
    let user = t.db.get_user_by_username("alice").unwrap().unwrap();
    let forged = issue_token(&user, &ServerConfig::new("some-other-secret")).unwrap();
    let (status, _) = send(&t.app, "GET", "/api/users/category", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_edit_profile() {
    let t = setup_test_app();
    register(&t.db, "bob");

    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/edit-profile",
        Some(&t.token),
        Some(json!({"firstName": "Alice", "lastName": "Liddell"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lastName"], "Liddell");
    assert_eq!(json["username"], "alice");

    let (status, _) = send(
        &t.app,
        "PUT",
        "/api/users/edit-profile",
        Some(&t.token),
        Some(json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let t = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/users/category")
        .header("authorization", format!("Bearer {}", t.token))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["message"].as_str().unwrap().starts_with("Invalid JSON"));
}

#[tokio::test]
async fn test_legacy_route_paths() {
    let t = setup_test_app();

    let (status, json) = send(&t.app, "GET", "/api/users/currentUser", Some(&t.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "alice");

    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/category/categories",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["subCategoryName"], "Groceries");

    let (status, _) = send(&t.app, "GET", "/api/users/category/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ========== Category API Tests ==========

#[tokio::test]
async fn test_categories() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/category",
        Some(&t.token),
        Some(json!({"categoryName": "Health"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["categoryName"], "Health");

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/category",
        Some(&t.token),
        Some(json!({"categoryName": "Health"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Category Name already Exist.");

    let (status, json) = send(&t.app, "GET", "/api/users/category", Some(&t.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_sub_category_lifecycle() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/category/subcategory",
        Some(&t.token),
        Some(json!({"subCategoryName": "Bus", "categoryName": "Transport"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["username"], "alice");
    let bus_id = json["id"].as_i64().unwrap();

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users/category/subcategory",
        Some(&t.token),
        Some(json!({"subCategoryName": "Taxi", "categoryName": "Travel"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Rename cascades into existing expense lines
    send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({
            "date": "2024-03-05",
            "expenses": [{"subCategoryName": "Bus", "quantity": 2, "amount": 1.5}]
        })),
    )
    .await;
    let (status, json) = send(
        &t.app,
        "PUT",
        &format!("/api/users/category/subcategory/{}", bus_id),
        Some(&t.token),
        Some(json!({"subCategoryName": "Tram"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["subCategoryName"], "Tram");
    assert_eq!(json["updatedExpenses"], 1);

    let (_, json) = send(
        &t.app,
        "GET",
        "/api/users/expenses/2024-03-05",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(json["expenses"][0]["subCategoryName"], "Tram");

    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/category/subcategory",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/users/category/subcategory/{}", bus_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/users/category/subcategory/{}", bus_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ========== Expense API Tests ==========

#[tokio::test]
async fn test_expense_day_lifecycle() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": [groceries(2.0, 50.0)]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["totalAmountInArray"], 100.0);
    assert_eq!(json["expenses"][0]["categoryName"], "Food");
    assert_eq!(json["expenses"][0]["totalAmountInArray"], 100.0);
    let first_id = json["expenses"][0]["id"].as_i64().unwrap();

    // Same (user, date) again
    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": [groceries(1.0, 1.0)]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["message"],
        "Expenses with the same user and date already Exists."
    );

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/expenses/2024-03-05/add",
        Some(&t.token),
        Some(groceries(1.0, 20.0)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["totalAmountInArray"], 120.0);
    let second_id = json["expenses"][1]["id"].as_i64().unwrap();

    let (status, json) = send(
        &t.app,
        "PUT",
        &format!("/api/users/expense/{}", second_id),
        Some(&t.token),
        Some(groceries(2.0, 20.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalAmountInArray"], 140.0);

    let (status, json) = send(
        &t.app,
        "GET",
        &format!("/api/users/expense/{}", second_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 2.0);

    let (status, json) = send(
        &t.app,
        "DELETE",
        &format!("/api/users/expense/{}", first_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalAmountInArray"], 40.0);
    assert_eq!(json["expenses"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &t.app,
        "DELETE",
        "/api/users/expenses/2024-03-05",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/expenses/2024-03-05",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expense_validation() {
    let t = setup_test_app();

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "05/03/2024", "expenses": [groceries(1.0, 1.0)]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({
            "date": "2024-03-05",
            "expenses": [{"subCategoryName": "Nope", "quantity": 1, "amount": 1}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Subcategory not found.");

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users/expenses/2024-03-06/add",
        Some(&t.token),
        Some(groceries(1.0, 1.0)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expenses_are_private() {
    let t = setup_test_app();
    let bob = register(&t.db, "bob");
    let bob_token = issue_token(&bob, &test_config()).unwrap();

    let (_, json) = send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": [groceries(1.0, 5.0)]})),
    )
    .await;
    let item_id = json["expenses"][0]["id"].as_i64().unwrap();

    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/api/users/expense/{}", item_id),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/expenses/2024-03-05",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_expense_listings() {
    let t = setup_test_app();
    for date in ["2024-03-05", "2024-03-20", "2024-04-02"] {
        let (status, _) = send(
            &t.app,
            "POST",
            "/api/users/expenses",
            Some(&t.token),
            Some(json!({"date": date, "expenses": [groceries(1.0, 10.0)]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let count = |json: &Value| json.as_array().map(|a| a.len()).unwrap_or(0);

    let (status, json) =
        send(&t.app, "GET", "/api/users/user-expenses", Some(&t.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&json), 3);

    let (_, json) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024-03",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(count(&json), 2);
    assert_eq!(json[0]["date"], "2024-03-05");

    let (_, json) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(count(&json), 3);

    // Week 1 of March is the 1st through the 7th
    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024-03/1",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&json), 1);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024-03/2",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024-03/x",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/1999-01",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Static segments win over the period parameter
    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/current",
        Some(&t.token),
        None,
    )
    .await;
    assert_ne!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/current-week",
        Some(&t.token),
        None,
    )
    .await;
    assert_ne!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_huge_week_number_is_bad_request() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/user-expenses/2024-03/20000000",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("outside of 2024-03"));
}

// ========== Budget API Tests ==========

#[tokio::test]
async fn test_allocation_response_and_decimal_remainder() {
    let t = setup_test_app();

    send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03", "budget": 0.3})),
    )
    .await;

    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/budget-category/2024-03",
        Some(&t.token),
        Some(json!({"categoryName": "Food", "budgetAmount": 0.1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updatedBudget"]["budget"], 0.3);
    assert!(json["updatedBudget"]["budgetPerCategory"].is_array());

    // Exactly the remainder fits
    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/budget-category/2024-03",
        Some(&t.token),
        Some(json!({"categoryName": "Transport", "budgetAmount": 0.2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["savings"].as_f64().unwrap().abs() < 1e-9);
}

#[tokio::test]
async fn test_march_budget_example() {
    let t = setup_test_app();

    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03-01", "budget": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["currentBalance"], 1000.0);
    assert_eq!(json["savings"], 1000.0);
    assert_eq!(json["budgetPerCategory"].as_array().unwrap().len(), 2);

    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/budget-category/2024-03",
        Some(&t.token),
        Some(json!({"categoryName": "Food", "budgetAmount": 300})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["savings"], 700.0);
    assert_eq!(json["updatedBudget"]["budget"], 1000.0);

    send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": [groceries(2.0, 50.0)]})),
    )
    .await;

    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/budget/2024-03-15",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["currentBalance"], 900.0);
    assert_eq!(json["date"], "2024-03-01");

    let (status, json) = send(
        &t.app,
        "GET",
        "/api/users/budget/2024-03/Food",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["budgetAmount"], 300.0);
}

#[tokio::test]
async fn test_budget_rules() {
    let t = setup_test_app();

    send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03", "budget": 500})),
    )
    .await;

    // One budget per month
    let (status, json) = send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03-20", "budget": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["message"],
        "Budget for the same month/year already exists."
    );

    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/budget-category/2024-03",
        Some(&t.token),
        Some(json!({"categoryName": "Food", "budgetAmount": 500.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Budget exceeded for the month.");

    let (status, _) = send(
        &t.app,
        "PUT",
        "/api/users/budget-category/2024-03",
        Some(&t.token),
        Some(json!({"categoryName": "Food", "budgetAmount": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Total cannot drop below what is allocated
    let (status, _) = send(
        &t.app,
        "PUT",
        "/api/users/budget/2024-03",
        Some(&t.token),
        Some(json!({"budget": 400})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &t.app,
        "PUT",
        "/api/users/budget/2024-03",
        Some(&t.token),
        Some(json!({"budget": 800})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["currentBalance"], 800.0);
    assert_eq!(json["savings"], 300.0);

    let (status, _) = send(
        &t.app,
        "GET",
        "/api/users/budget/2024-05",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_budget_category() {
    let t = setup_test_app();

    let (_, json) = send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03-01", "budget": 100})),
    )
    .await;
    let allocation_id = json["budgetPerCategory"][0]["id"].as_i64().unwrap();

    let (status, json) = send(
        &t.app,
        "DELETE",
        &format!("/api/users/budget-category/{}", allocation_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["budgetPerCategory"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/users/budget-category/{}", allocation_id),
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "DELETE",
        "/api/users/budget-category/abc",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_day_restores_balance() {
    let t = setup_test_app();

    send(
        &t.app,
        "POST",
        "/api/users/new-budget",
        Some(&t.token),
        Some(json!({"date": "2024-03-01", "budget": 1000})),
    )
    .await;
    send(
        &t.app,
        "POST",
        "/api/users/expenses",
        Some(&t.token),
        Some(json!({"date": "2024-03-05", "expenses": [groceries(2.0, 50.0)]})),
    )
    .await;
    send(
        &t.app,
        "DELETE",
        "/api/users/expenses/2024-03-05",
        Some(&t.token),
        None,
    )
    .await;

    let (_, json) = send(
        &t.app,
        "GET",
        "/api/users/budget/2024-03",
        Some(&t.token),
        None,
    )
    .await;
    assert_eq!(json["currentBalance"], 1000.0);
}

// ========== Cross-cutting Tests ==========

#[tokio::test]
async fn test_requests_are_audited() {
    let t = setup_test_app();

    send(&t.app, "GET", "/api/users/category", Some(&t.token), None).await;

    let entries = t.db.list_audit_log(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor, "alice");
    assert_eq!(entries[0].action, "list");
    assert_eq!(entries[0].entity_type.as_deref(), Some("category"));
}

#[tokio::test]
async fn test_audit_actor_follows_username_change() {
    let t = setup_test_app();

    let (status, _) = send(
        &t.app,
        "PUT",
        "/api/users/edit-profile",
        Some(&t.token),
        Some(json!({"username": "alicia"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The token still carries the old username
    let (status, json) = send(&t.app, "GET", "/api/users/current-user", Some(&t.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "alicia");

    send(&t.app, "GET", "/api/users/category", Some(&t.token), None).await;
    let entries = t.db.list_audit_log(1).unwrap();
    assert_eq!(entries[0].actor, "alicia");
}

#[tokio::test]
async fn test_security_headers() {
    let t = setup_test_app();

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/category")
                .header("authorization", format!("Bearer {}", t.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

#[test]
fn test_app_error_classification() {
    let err = AppError::from(spendwise_core::Error::conflict("dup"));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let err = AppError::from(spendwise_core::Error::validation("bad"));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = AppError::from(spendwise_core::Error::not_found("gone"));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    // Storage failures hide their details
    let err = AppError::from(spendwise_core::Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "disk on fire",
    )));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "An internal error occurred");
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins("http://localhost:3000, https://app.example.com,,"),
        vec!["http://localhost:3000", "https://app.example.com"]
    );
    assert!(parse_origins("").is_empty());
}

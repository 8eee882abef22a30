//! Task board and trip records through the HTTP surface, always as an
//! authenticated owner.

mod support;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use support::{request, test_app, TestApp};

async fn create_todo(t: &TestApp, token: &str, title: &str) -> Value {
    let (status, _, json) = t.send(request(Method::POST, "/api/todos", Some(token), Some(json!({ "title": title })))).await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

async fn move_todo(t: &TestApp, token: &str, id: i64, status: &str, index: usize) -> (StatusCode, Value) {
    let uri = format!("/api/todos/{}/move", id);
    let (status, _, json) = t.send(request(Method::POST, &uri, Some(token), Some(json!({ "status": status, "index": index })))).await;
    (status, json)
}

async fn column(t: &TestApp, token: &str, status: &str) -> Vec<(String, f64)> {
    let (code, _, json) = t.send(request(Method::GET, "/api/todos", Some(token), None)).await;
    assert_eq!(code, StatusCode::OK);
    json.as_array()
        .expect("array")
        .iter()
        .filter(|t| t["status"] == status)
        .map(|t| (t["title"].as_str().unwrap_or_default().to_string(), t["position"].as_f64().unwrap_or(f64::NAN)))
        .collect()
}

async fn signed_in(t: &TestApp, name: &str) -> String {
    t.add_user(name, "correct horse", None);
    t.login(name, "correct horse").await
}

#[tokio::test]
async fn move_between_neighbours_takes_the_midpoint() {
    let t = test_app();
    let token = signed_in(&t, "alice").await;
    for title in ["a", "b", "c"] {
        create_todo(&t, &token, title).await;
    }
    let d = create_todo(&t, &token, "d").await;
    assert_eq!(d["position"], 40_000.0);
    assert_eq!(d["status"], "pending");

    let (status, moved) = move_todo(&t, &token, d["id"].as_i64().expect("id"), "pending", 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["position"], 15_000.0);

    let col = column(&t, &token, "pending").await;
    assert_eq!(
        col,
        vec![("a".to_string(), 10_000.0), ("d".to_string(), 15_000.0), ("b".to_string(), 20_000.0), ("c".to_string(), 30_000.0)]
    );
}

#[tokio::test]
async fn move_into_empty_column_gets_default_gap() {
    let t = test_app();
    let token = signed_in(&t, "alice").await;
    let a = create_todo(&t, &token, "a").await;
    let (status, moved) = move_todo(&t, &token, a["id"].as_i64().expect("id"), "in-progress", 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "in-progress");
    assert_eq!(moved["position"], 10_000.0);
    assert!(column(&t, &token, "pending").await.is_empty());
}

#[tokio::test]
async fn unknown_status_and_bad_index_are_rejected() {
    let t = test_app();
    let token = signed_in(&t, "alice").await;
    let a = create_todo(&t, &token, "a").await;
    let id = a["id"].as_i64().expect("id");

    let (status, json) = move_todo(&t, &token, id, "someday", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_status");

    let (status, json) = move_todo(&t, &token, id, "completed", 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_index");

    let uri = format!("/api/todos/{}", id);
    let (status, _, json) = t.send(request(Method::PUT, &uri, Some(&token), Some(json!({ "status": "DONE" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_status");
}

#[tokio::test]
async fn other_users_todos_are_invisible() {
    let t = test_app();
    let alice = signed_in(&t, "alice").await;
    let bob = signed_in(&t, "bob").await;
    let a = create_todo(&t, &alice, "alice's").await;
    let id = a["id"].as_i64().expect("id");

    assert!(column(&t, &bob, "pending").await.is_empty());
    let (status, _) = move_todo(&t, &bob, id, "completed", 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/todos/{}", id);
    let (status, _, _) = t.send(request(Method::PUT, &uri, Some(&bob), Some(json!({ "title": "mine now" })))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = t.send(request(Method::DELETE, &uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(column(&t, &alice, "pending").await, vec![("alice's".to_string(), 10_000.0)]);
    let (status, _, _) = t.send(request(Method::DELETE, &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn trip_records_crud() {
    let t = test_app();
    let token = signed_in(&t, "alice").await;

    let item = json!({ "title": "Flight", "date": "2025-06-01", "time": "08:30", "type": "transport" });
    let (status, _, created) = t.send(request(Method::POST, "/api/itinerary", Some(&token), Some(item))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "transport");
    let uri = format!("/api/itinerary/{}", created["id"]);
    let (status, _, updated) = t.send(request(Method::PUT, &uri, Some(&token), Some(json!({ "title": "Flight LIS" })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Flight LIS");

    let stay = json!({ "name": "Casa Azul", "check_in": "2025-06-01", "check_out": "2025-06-04", "price": 310.0 });
    let (status, _, stay) = t.send(request(Method::POST, "/api/stays", Some(&token), Some(stay))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, stays) = t.send(request(Method::GET, "/api/stays", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stays.as_array().map(Vec::len), Some(1));
    let uri = format!("/api/stays/{}", stay["id"]);
    let (status, _, _) = t.send(request(Method::DELETE, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let expense = json!({ "title": "Tram", "amount": 3.1, "category": "transport", "date": "2025-06-02" });
    let (status, _, expense) = t.send(request(Method::POST, "/api/expenses", Some(&token), Some(expense))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["amount"], 3.1);
    let (status, _, _) = t.send(request(Method::PUT, "/api/me", Some(&token), Some(json!({ "budget_limit": 100.0 })))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, summary) = t.send(request(Method::GET, "/api/expenses/summary", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({ "total": 3.1, "budget_limit": 100.0, "remaining": 96.9 }));

    let (status, _, json) = t.send(request(Method::POST, "/api/expenses", Some(&token), Some(json!({ "title": "no amount" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_body");
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let t = test_app();
    let token = signed_in(&t, "alice").await;
    let title = "x".repeat(20 * 1024);
    let (status, _, json) = t.send(request(Method::POST, "/api/todos", Some(&token), Some(json!({ "title": title })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_body");
    assert!(column(&t, &token, "pending").await.is_empty());
}

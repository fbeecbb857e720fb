use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery staple";

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    server::router(engine, db)
}

fn credentials(email: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{email}:{password}")))
}

fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

async fn register(app: &Router, first_name: &str, email: &str) -> String {
    let payload = json!({
        "email": email,
        "password": PASSWORD,
        "first_name": first_name,
        "last_name": "Tester",
    });
    let (status, body) = send(
        app,
        request(Method::POST, "/api/register", None, Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["id"].as_str().unwrap().to_string()
}

async fn create_group(app: &Router, auth: &str, title: &str, emails: &[&str]) -> String {
    let payload = json!({ "title": title, "memberEmails": emails });
    let (status, body) = send(
        app,
        request(Method::POST, "/api/groups", Some(auth), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["groupId"].as_str().unwrap().to_string()
}

async fn member_id(app: &Router, auth: &str, group_id: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        request(Method::GET, &format!("/api/groups/{group_id}"), Some(auth), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|member| member["email"] == json!(email))
        .unwrap()["user_id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn register_and_fetch_own_profile() {
    let app = app().await;
    let id = register(&app, "Alice", "alice@example.com").await;

    let auth = credentials("alice@example.com", PASSWORD);
    let (status, body) = send(&app, request(Method::GET, "/api/me", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["email"], json!("alice@example.com"));
    assert_eq!(body["first_name"], json!("Alice"));
    assert_eq!(body["name"], json!("Alice Tester"));
}

#[tokio::test]
async fn missing_or_bad_credentials_are_rejected() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;

    let (status, _) = send(&app, request(Method::GET, "/api/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = credentials("alice@example.com", "not the password");
    let (status, _) = send(&app, request(Method::GET, "/api/me", Some(&wrong), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = credentials("nobody@example.com", PASSWORD);
    let (status, _) = send(&app, request(Method::GET, "/api/me", Some(&unknown), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;

    let auth = credentials("Alice@Example.COM", PASSWORD);
    let (status, _) = send(&app, request(Method::GET, "/api/me", Some(&auth), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;

    let payload = json!({
        "email": "alice@example.com",
        "password": PASSWORD,
        "first_name": "Another",
        "last_name": "Alice",
    });
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/register", None, Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("\"alice@example.com\" already present!"));
}

#[tokio::test]
async fn group_lifecycle() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    register(&app, "Carol", "carol@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let bob = credentials("bob@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &["bob@example.com"]).await;

    // Members see the group in their own listing.
    let (status, body) = send(&app, request(Method::GET, "/api/groups", Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!(group_id));
    assert_eq!(body[0]["title"], json!("Trip"));

    let detail_uri = format!("/api/groups/{group_id}");
    let (status, body) = send(&app, request(Method::GET, &detail_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(group_id));
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["name"], json!("Alice Tester"));
    assert_eq!(members[1]["email"], json!("bob@example.com"));

    // Only the creator may grow the roster.
    let members_uri = format!("/api/groups/{group_id}/members");
    let payload = json!({ "memberEmails": ["carol@example.com"] });
    let (status, body) = send(
        &app,
        request(Method::POST, &members_uri, Some(&bob), Some(payload.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("Not allowed: only the group creator can do this"));

    let (status, _) = send(
        &app,
        request(Method::POST, &members_uri, Some(&alice), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, request(Method::GET, &detail_uri, Some(&alice), None)).await;
    assert_eq!(body["members"].as_array().unwrap().len(), 3);

    // Only the creator may delete the group.
    let (status, _) = send(&app, request(Method::DELETE, &detail_uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::DELETE, &detail_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, &detail_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("\"group\" not found!"));
}

#[tokio::test]
async fn group_with_unknown_member_email_is_rejected() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);

    let payload = json!({ "title": "Trip", "memberEmails": ["dave@example.com"] });
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/groups", Some(&alice), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("\"dave@example.com\" not found!"));
}

#[tokio::test]
async fn outsiders_cannot_see_a_group() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Carol", "carol@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let carol = credentials("carol@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &[]).await;

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/groups/{group_id}"), Some(&carol), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("Not allowed: not a member of this group"));

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&carol),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn percentage_expense_round_trip() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let bob = credentials("bob@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &["bob@example.com"]).await;
    let alice_id = member_id(&app, &alice, &group_id, "alice@example.com").await;
    let bob_id = member_id(&app, &alice, &group_id, "bob@example.com").await;

    let payload = json!({
        "title": "Dinner",
        "total_amount": "50.00",
        "description": "Seafood place",
        "split_type": "percentage",
        "splits": [
            { "user_id": alice_id, "percentage": 60.0 },
            { "user_id": bob_id, "percentage": 40.0 },
        ],
    });
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["group_title"], json!("Trip"));
    assert_eq!(body["total_amount"], json!("50.00"));
    assert_eq!(body["split_type"], json!("percentage"));
    assert_eq!(body["is_settled"], json!(false));
    let splits = body["splits"].as_array().unwrap();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0]["user_name"], json!("Alice Tester"));
    assert_eq!(splits[0]["amount"], json!("30.00"));
    assert_eq!(splits[0]["percentage"], json!(60.0));
    assert_eq!(splits[1]["amount"], json!("20.00"));
    assert_eq!(splits[1]["is_accepted"], json!(false));

    let expense_id = body["expense_id"].as_str().unwrap().to_string();

    // Visible in the group listing and in each participant's own feed.
    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&bob),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, request(Method::GET, "/api/expenses", Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["expense_id"], json!(expense_id));

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/expenses/{expense_id}"), Some(&bob), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("Seafood place"));
}

#[tokio::test]
async fn even_split_sends_remainder_to_first_members() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    register(&app, "Carol", "carol@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);

    let group_id = create_group(
        &app,
        &alice,
        "Trip",
        &["bob@example.com", "carol@example.com"],
    )
    .await;
    let alice_id = member_id(&app, &alice, &group_id, "alice@example.com").await;
    let bob_id = member_id(&app, &alice, &group_id, "bob@example.com").await;
    let carol_id = member_id(&app, &alice, &group_id, "carol@example.com").await;

    let payload = json!({
        "title": "Cabin",
        "total_amount": 100.0,
        "split_type": "even",
        "splits": [
            { "user_id": alice_id },
            { "user_id": bob_id },
            { "user_id": carol_id },
        ],
    });
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let splits = body["splits"].as_array().unwrap();
    let amounts: Vec<&Value> = splits.iter().map(|s| &s["amount"]).collect();
    assert_eq!(amounts, vec![&json!("33.34"), &json!("33.33"), &json!("33.33")]);
    assert_eq!(splits[0]["percentage"], json!(33.4));
    assert_eq!(splits[1]["percentage"], json!(33.3));
}

#[tokio::test]
async fn mismatched_amounts_map_to_400() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &["bob@example.com"]).await;
    let alice_id = member_id(&app, &alice, &group_id, "alice@example.com").await;
    let bob_id = member_id(&app, &alice, &group_id, "bob@example.com").await;

    let payload = json!({
        "title": "Groceries",
        "total_amount": "50.00",
        "split_type": "amount",
        "splits": [
            { "user_id": alice_id, "amount": "30.00" },
            { "user_id": bob_id, "amount": "15.00" },
        ],
    });
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Invalid input: amounts must sum to 50.00, remaining 5.00")
    );

    // A split without its amount is caught before the engine runs.
    let payload = json!({
        "title": "Groceries",
        "total_amount": "50.00",
        "split_type": "amount",
        "splits": [
            { "user_id": alice_id, "amount": "30.00" },
            { "user_id": bob_id },
        ],
    });
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("amount is required for amount splits"));
}

#[tokio::test]
async fn split_settlement_flow() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let bob = credentials("bob@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &["bob@example.com"]).await;
    let alice_id = member_id(&app, &alice, &group_id, "alice@example.com").await;
    let bob_id = member_id(&app, &alice, &group_id, "bob@example.com").await;

    let payload = json!({
        "title": "Dinner",
        "total_amount": "40.00",
        "split_type": "even",
        "splits": [{ "user_id": alice_id }, { "user_id": bob_id }],
    });
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = body["expense_id"].as_str().unwrap().to_string();
    let split_of = |body: &Value, user_id: &str| -> String {
        body["splits"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["user_id"] == json!(user_id))
            .unwrap()["split_id"]
            .as_str()
            .unwrap()
            .to_string()
    };
    let alice_split = split_of(&body, &alice_id);
    let bob_split = split_of(&body, &bob_id);

    // Paying an unaccepted split is rejected.
    let pay_uri = format!("/api/expenses/{expense_id}/splits/{bob_split}");
    let (status, body) = send(
        &app,
        request(Method::PUT, &pay_uri, Some(&bob), Some(json!({ "is_paid": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Invalid input: a split must be accepted before it can be paid")
    );

    // Only the participant may touch their split.
    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            &pay_uri,
            Some(&alice),
            Some(json!({ "is_accepted": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        json!("Not allowed: only the split's participant can update it")
    );

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            &pay_uri,
            Some(&bob),
            Some(json!({ "is_accepted": true, "is_paid": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_accepted"], json!(true));
    assert_eq!(body["is_paid"], json!(true));

    let detail_uri = format!("/api/expenses/{expense_id}");
    let (_, body) = send(&app, request(Method::GET, &detail_uri, Some(&alice), None)).await;
    assert_eq!(body["is_settled"], json!(false));

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            &format!("/api/expenses/{expense_id}/splits/{alice_split}"),
            Some(&alice),
            Some(json!({ "is_accepted": true, "is_paid": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, request(Method::GET, &detail_uri, Some(&alice), None)).await;
    assert_eq!(body["is_settled"], json!(true));
}

#[tokio::test]
async fn expense_deletion_is_creator_only() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let bob = credentials("bob@example.com", PASSWORD);

    let group_id = create_group(&app, &alice, "Trip", &["bob@example.com"]).await;
    let alice_id = member_id(&app, &alice, &group_id, "alice@example.com").await;

    let payload = json!({
        "title": "Taxi",
        "total_amount": "12.00",
        "split_type": "even",
        "splits": [{ "user_id": alice_id }],
    });
    let (_, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/groups/{group_id}/expenses"),
            Some(&alice),
            Some(payload),
        ),
    )
    .await;
    let expense_id = body["expense_id"].as_str().unwrap().to_string();

    let uri = format!("/api/expenses/{expense_id}");
    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("\"expense\" not found!"));
}

#[tokio::test]
async fn unknown_ids_report_404() {
    let app = app().await;
    register(&app, "Alice", "alice@example.com").await;
    let alice = credentials("alice@example.com", PASSWORD);
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/groups/{missing}"), Some(&alice), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/expenses/{missing}"), Some(&alice), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_account_loses_access() {
    let app = app().await;
    register(&app, "Carol", "carol@example.com").await;
    let carol = credentials("carol@example.com", PASSWORD);

    let delete = request(Method::DELETE, "/api/users/me", Some(&carol), None);
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request(Method::GET, "/api/me", Some(&carol), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The email is free for a fresh registration.
    register(&app, "Carol", "carol@example.com").await;
}

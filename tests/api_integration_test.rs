use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use librarysphere::auth::hash_password;
use librarysphere::db;
use librarysphere::infrastructure::AppState;
use librarysphere::models::{Role, document, user};
use librarysphere::server::build_router;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, code: &str, password: &str, role: Role) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        code: Set(code.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set(code.to_string()),
        email: Set(format!("{}@example.com", code.to_lowercase())),
        phone: Set(None),
        address: Set(None),
        password_hash: Set(hash_password(password).unwrap()),
        role: Set(role),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create user")
        .last_insert_id
}

async fn create_test_document(db: &DatabaseConnection, code: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let doc = document::ActiveModel {
        code: Set(code.to_string()),
        title: Set("Dune".to_string()),
        author: Set("Frank Herbert".to_string()),
        year: Set(Some(1965)),
        category: Set("Science Fiction".to_string()),
        document_type: Set("book".to_string()),
        age_classification: Set("12+".to_string()),
        description: Set(None),
        isbn: Set(None),
        image_url: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    document::Entity::insert(doc)
        .exec(db)
        .await
        .expect("Failed to create document")
        .last_insert_id
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(app: &Router, code: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": format!("{}@example.com", code.to_lowercase()),
            "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

struct TestApp {
    app: Router,
    staff_token: String,
    member_token: String,
    member_id: i32,
    other_member_id: i32,
    doc: i32,
}

async fn setup_app() -> TestApp {
    let db = setup_test_db().await;
    create_test_user(&db, "EMP-1", "staffpass", Role::Employee).await;
    let member_id = create_test_user(&db, "MBR-1", "memberpass", Role::Member).await;
    let other_member_id = create_test_user(&db, "MBR-2", "memberpass", Role::Member).await;
    let doc = create_test_document(&db, "DOC-1").await;

    let app = build_router(AppState::new(db), &[]);
    let staff_token = login(&app, "EMP-1", "staffpass").await;
    let member_token = login(&app, "MBR-1", "memberpass").await;

    TestApp {
        app,
        staff_token,
        member_token,
        member_id,
        other_member_id,
        doc,
    }
}

#[tokio::test]
async fn test_health_check() {
    let db = setup_test_db().await;
    let app = build_router(AppState::new(db), &[]);

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "librarysphere");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let t = setup_app().await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "mbr-1@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_lending_requires_token() {
    let t = setup_app().await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/loans",
        None,
        Some(json!({ "document_id": t.doc })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, "GET", "/api/loans", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_loan_lifecycle_over_http() {
    let t = setup_app().await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/loans",
        Some(&t.staff_token),
        Some(json!({ "document_id": t.doc, "member_id": t.member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["loan"]["status"], "active");
    assert_eq!(body["loan"]["document"]["code"], "DOC-1");
    assert_eq!(body["loan"]["member"]["code"], "MBR-1");
    let loan_id = body["loan"]["id"].as_i64().unwrap();

    // Second loan on the same document
    let (status, body) = send(
        &t.app,
        "POST",
        "/api/loans",
        Some(&t.staff_token),
        Some(json!({ "document_id": t.doc, "member_id": t.other_member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["error"], "Document is already on loan");

    // Catalog reflects availability
    let (_, body) = send(&t.app, "GET", &format!("/api/documents/{}", t.doc), None, None).await;
    assert_eq!(body["document"]["available"], false);

    let uri = format!("/api/loans/{}/return", loan_id);
    let (status, _) = send(&t.app, "PUT", &uri, Some(&t.member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&t.app, "PUT", &uri, Some(&t.staff_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "returned");

    let (status, body) = send(&t.app, "PUT", &uri, Some(&t.staff_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");
}

#[tokio::test]
async fn test_reservation_flow_over_http() {
    let t = setup_app().await;

    // Reserving an available document is refused
    let (status, body) = send(
        &t.app,
        "POST",
        "/api/reservations",
        Some(&t.member_token),
        Some(json!({ "document_id": t.doc })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/loans",
        Some(&t.staff_token),
        Some(json!({ "document_id": t.doc, "member_id": t.other_member_id })),
    )
    .await;
    let loan_id = body["loan"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/reservations",
        Some(&t.member_token),
        Some(json!({ "document_id": t.doc })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["reservation"]["status"], "pending");
    let resv_id = body["reservation"]["id"].as_i64().unwrap();

    let fulfill = format!("/api/reservations/{}/fulfill", resv_id);
    let (status, _) = send(&t.app, "POST", &fulfill, Some(&t.member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Still on loan
    let (status, body) = send(&t.app, "POST", &fulfill, Some(&t.staff_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "conflict");

    send(
        &t.app,
        "PUT",
        &format!("/api/loans/{}/return", loan_id),
        Some(&t.staff_token),
        None,
    )
    .await;

    let (status, body) = send(&t.app, "POST", &fulfill, Some(&t.staff_token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["reservation"]["status"], "fulfilled");
    assert_eq!(body["loan"]["member_id"], t.member_id);

    let (status, body) = send(
        &t.app,
        "PUT",
        &format!("/api/reservations/{}/status", resv_id),
        Some(&t.staff_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_state");
}

#[tokio::test]
async fn test_member_cannot_update_reservation_status() {
    let t = setup_app().await;

    let (status, _) = send(
        &t.app,
        "PUT",
        "/api/reservations/1/status",
        Some(&t.member_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        "PUT",
        "/api/reservations/999/status",
        Some(&t.staff_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_document_management_requires_staff() {
    let t = setup_app().await;
    let payload = json!({
        "code": "DOC-2",
        "title": "Foundation",
        "author": "Isaac Asimov",
        "year": 1951,
        "category": "Science Fiction",
        "document_type": "book",
        "age_classification": "12+"
    });

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/documents",
        Some(&t.member_token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/documents",
        Some(&t.staff_token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let new_id = body["document"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/documents",
        Some(&t.staff_token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(&t.app, "GET", "/api/documents?q=asimov", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/api/documents/{}", new_id),
        Some(&t.staff_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_me() {
    let db = setup_test_db().await;
    let app = build_router(AppState::new(db), &[]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Zoe",
            "last_name": "Reader",
            "email": "Zoe@Example.com",
            "password": "longenough"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["role"], "member");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "zoe@example.com");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Short",
            "last_name": "Pass",
            "email": "short@example.com",
            "password": "123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_only_admins_manage_employees() {
    let t = setup_app().await;
    let employee = json!({
        "first_name": "New",
        "last_name": "Clerk",
        "email": "clerk@example.com",
        "password": "clerkpass",
        "role": "employee"
    });

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/users",
        Some(&t.staff_token),
        Some(employee),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/users",
        Some(&t.staff_token),
        Some(json!({
            "first_name": "New",
            "last_name": "Member",
            "email": "new.member@example.com",
            "password": "memberpass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["role"], "member");

    let (status, _) = send(&t.app, "GET", "/api/users", Some(&t.member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_change_applies_to_existing_token() {
    let db = setup_test_db().await;
    let staff_id = create_test_user(&db, "EMP-1", "staffpass", Role::Employee).await;
    let app = build_router(AppState::new(db.clone()), &[]);
    let token = login(&app, "EMP-1", "staffpass").await;

    let (status, _) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Demote directly in the database; the token still says employee
    let mut account: user::ActiveModel = user::Entity::find_by_id(staff_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .into();
    account.role = Set(Role::Member);
    account.update(&db).await.unwrap();

    let (status, body) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    user::Entity::delete_by_id(staff_id).exec(&db).await.unwrap();
    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_catalog_availability_query() {
    let t = setup_app().await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/documents",
        Some(&t.staff_token),
        Some(json!({
            "code": "DOC-2",
            "title": "Foundation",
            "author": "Isaac Asimov",
            "category": "Science Fiction",
            "document_type": "book",
            "age_classification": "12+"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    send(
        &t.app,
        "POST",
        "/api/loans",
        Some(&t.staff_token),
        Some(json!({ "document_id": t.doc, "member_id": t.member_id })),
    )
    .await;

    let (status, body) = send(&t.app, "GET", "/api/documents?available=false", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["documents"][0]["code"], "DOC-1");

    let (_, body) = send(&t.app, "GET", "/api/documents?available=true", None, None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["documents"][0]["code"], "DOC-2");

    let (_, body) = send(&t.app, "GET", "/api/documents?limit=1&page=1", None, None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
}

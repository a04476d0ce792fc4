mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use bebaby_api::conversations::MESSAGE_PAGE;
use bebaby_api::profile::MAX_PHOTO_BYTES;
use bebaby_types::models::UserStatus;

use common::*;

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();
    let body = json!({
        "email": "Alice@Example.com",
        "username": "alice",
        "password": "s3cret-pass",
        "userType": "SUGAR_BABY",
        "state": "CA",
    });

    let created = app.send(json(Method::POST, "/auth/register", body.clone())).await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert!(created.body["token"].as_str().is_some());

    let mut same_email = body.clone();
    same_email["username"] = json!("alice2");
    let dup = app.send(json(Method::POST, "/auth/register", same_email)).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
    assert_eq!(dup.error(), "email already exists");

    let mut same_username = body;
    same_username["email"] = json!("alice2@example.com");
    let dup = app.send(json(Method::POST, "/auth/register", same_username)).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
    assert_eq!(dup.error(), "username already exists");

    let login = app
        .send(json(
            Method::POST,
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "s3cret-pass" }),
        ))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["username"], "alice");

    let wrong = app
        .send(json(
            Method::POST,
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "not-it-at-all" }),
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_are_400_naming_the_field() {
    let app = TestApp::new();

    let missing = app
        .send(json(Method::POST, "/auth/login", json!({ "email": "a@example.com" })))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert!(missing.error().contains("password"), "{}", missing.error());

    let unknown = app
        .send(json(
            Method::POST,
            "/auth/login",
            json!({ "email": "a@example.com", "password": "x", "isAdmin": true }),
        ))
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert!(unknown.error().contains("isAdmin"), "{}", unknown.error());
}

#[tokio::test]
async fn banned_user_cannot_interact() {
    let app = TestApp::new();
    let banned = app.seed_user("banned", None);
    let other = app.seed_user("other", None);
    app.state
        .db
        .set_user_status(&banned.id.to_string(), UserStatus::Banned)
        .unwrap();
    let token = app.token_for(&banned);

    let attempts = [
        json(Method::POST, "/conversations", json!({})),
        user_json(Method::POST, "/conversations", &token, json!({ "participantId": other.id })),
        user_json(
            Method::POST,
            "/reports",
            &token,
            json!({ "reportedId": other.id, "reason": "spam" }),
        ),
        user_json(Method::PUT, "/me/about", &token, json!({ "about": "hi" })),
    ];
    let mut statuses = Vec::new();
    for req in attempts {
        statuses.push(app.send(req).await.status);
    }
    assert_eq!(
        statuses,
        [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::FORBIDDEN,
            StatusCode::FORBIDDEN
        ]
    );
    assert!(app.state.db.list_reports(None, 10).unwrap().is_empty());

    // Reading is still allowed.
    let inbox = app.send(user_get("/notifications", &token)).await;
    assert_eq!(inbox.status, StatusCode::OK);
}

#[tokio::test]
async fn conversations_are_idempotent_and_private() {
    let app = TestApp::new();
    let alice = app.seed_user("alice", None);
    let bob = app.seed_user("bob", None);
    let carol = app.seed_user("carol", None);
    let (ta, tb, tc) = (app.token_for(&alice), app.token_for(&bob), app.token_for(&carol));

    let first = app
        .send(user_json(Method::POST, "/conversations", &ta, json!({ "participantId": bob.id })))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["created"], true);

    let second = app
        .send(user_json(Method::POST, "/conversations", &tb, json!({ "participantId": alice.id })))
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["created"], false);
    assert_eq!(first.body["conversation"]["id"], second.body["conversation"]["id"]);

    let id = first.body["conversation"]["id"].as_str().unwrap().to_string();
    let uri = format!("/conversations/{id}/messages");

    let sent = app
        .send(user_json(Method::POST, &uri, &ta, json!({ "content": "hello bob" })))
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);

    let outsider_read = app.send(user_get(&uri, &tc)).await;
    assert_eq!(outsider_read.status, StatusCode::NOT_FOUND);
    let outsider_write = app
        .send(user_json(Method::POST, &uri, &tc, json!({ "content": "hi" })))
        .await;
    assert_eq!(outsider_write.status, StatusCode::NOT_FOUND);

    let read = app.send(user_get(&uri, &tb)).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body.as_array().unwrap().len(), 1);

    let inbox = app.send(user_get("/notifications", &tb)).await;
    assert_eq!(inbox.body[0]["type"], "message");

    let selfie = app
        .send(user_json(Method::POST, "/conversations", &ta, json!({ "participantId": alice.id })))
        .await;
    assert_eq!(selfie.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn long_history_pages_back_from_newest() {
    let app = TestApp::new();
    let alice = app.seed_user("alice", None);
    let bob = app.seed_user("bob", None);
    let (conversation, _) = app
        .state
        .db
        .get_or_create_conversation(alice.id, bob.id)
        .unwrap();
    let total = MESSAGE_PAGE as usize + 5;
    for i in 0..total {
        app.state
            .db
            .insert_message(&conversation.id, alice.id, &format!("m{i}"))
            .unwrap();
    }
    let unread = |app: &TestApp| {
        app.state
            .db
            .list_messages(&conversation.id, None, 1000)
            .unwrap()
            .iter()
            .filter(|m| !m.read)
            .count()
    };
    let token = app.token_for(&bob);
    let uri = format!("/conversations/{}/messages", conversation.id);

    let newest = app.send(user_get(&uri, &token)).await;
    assert_eq!(newest.status, StatusCode::OK);
    let page = newest.body.as_array().unwrap();
    assert_eq!(page.len(), MESSAGE_PAGE as usize);
    assert_eq!(page.last().unwrap()["content"], format!("m{}", total - 1));
    // Only what was shown is marked read.
    assert_eq!(unread(&app), 5);

    let cursor = page[0]["id"].as_str().unwrap();
    let older = app
        .send(user_get(&format!("{uri}?before={cursor}"), &token))
        .await;
    assert_eq!(older.status, StatusCode::OK);
    assert_eq!(older.body.as_array().unwrap().len(), 5);
    assert_eq!(older.body[0]["content"], "m0");
    assert_eq!(unread(&app), 0);
}

#[tokio::test]
async fn trip_fan_out_is_deduplicated() {
    let app = TestApp::new();
    let traveler = app.seed_user("traveler", Some("CA"));
    let local = app.seed_user("local", Some("CA"));
    app.seed_user("faraway", Some("NY"));
    let token = app.token_for(&traveler);
    let body = json!({
        "state": "CA",
        "city": "LA",
        "start": "2024-06-01",
        "end": "2024-06-05",
        "userId": traveler.id,
        "username": "traveler",
    });

    let first = app.send(user_json(Method::POST, "/notify-trip", &token, body.clone())).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["recipients"], 1);
    assert_eq!(first.body["created"], 1);

    let second = app.send(user_json(Method::POST, "/notify-trip", &token, body)).await;
    assert_eq!(second.body["created"], 0);
    assert_eq!(app.state.db.list_notifications(local.id, 10).unwrap().len(), 1);

    let spoofed = app
        .send(user_json(
            Method::POST,
            "/notify-trip",
            &token,
            json!({
                "state": "CA", "city": "LA", "start": "a", "end": "b",
                "userId": local.id, "username": "local",
            }),
        ))
        .await;
    assert_eq!(spoofed.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notifications_are_marked_read_by_owner_only() {
    let app = TestApp::new();
    let traveler = app.seed_user("traveler", Some("CA"));
    let local = app.seed_user("local", Some("CA"));
    app.state
        .db
        .fan_out_trip(&bebaby_types::models::TripNotice {
            sender_id: traveler.id,
            sender_username: "traveler".into(),
            state: "CA".into(),
            city: "LA".into(),
            start: "x".into(),
            end: "y".into(),
        })
        .unwrap();
    let id = app.state.db.list_notifications(local.id, 10).unwrap()[0].id;
    let uri = format!("/notifications/{id}/read");

    let stranger = app
        .send(user_json(Method::PUT, &uri, &app.token_for(&traveler), json!({})))
        .await;
    assert_eq!(stranger.status, StatusCode::NOT_FOUND);

    let owner = app
        .send(user_json(Method::PUT, &uri, &app.token_for(&local), json!({})))
        .await;
    assert_eq!(owner.status, StatusCode::OK);
    assert!(app.state.db.list_notifications(local.id, 10).unwrap()[0].read);
}

#[tokio::test]
async fn report_validation() {
    let app = TestApp::new();
    let me = app.seed_user("me", None);
    let token = app.token_for(&me);

    let myself = app
        .send(user_json(
            Method::POST,
            "/reports",
            &token,
            json!({ "reportedId": me.id, "reason": "test" }),
        ))
        .await;
    assert_eq!(myself.status, StatusCode::BAD_REQUEST);

    let ghost = app
        .send(user_json(
            Method::POST,
            "/reports",
            &token,
            json!({ "reportedId": uuid::Uuid::new_v4(), "reason": "spam" }),
        ))
        .await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);

    let blank = app
        .send(user_json(
            Method::POST,
            "/reports",
            &token,
            json!({ "reportedId": uuid::Uuid::new_v4(), "reason": "   " }),
        ))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error(), "reason is required");
}

fn photo(token: &str, content_type: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/photos")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn photo_upload_is_stored_pending() {
    let app = TestApp::new();
    let me = app.seed_user("me", None);
    let token = app.token_for(&me);

    let res = app.send(photo(&token, "image/png", vec![0x89, b'P', b'N', b'G'])).await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["status"], "PENDING");
    let url = res.body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let file_name = url.trim_start_matches("/uploads/");
    assert!(app.state.config.upload_dir.join(file_name).exists());

    // Not on the profile until approved.
    let profile = app.state.db.get_user(&me.id.to_string()).unwrap().unwrap();
    assert!(profile.photo_url.is_none());

    let svg = app.send(photo(&token, "image/svg+xml", vec![b'<'])).await;
    assert_eq!(svg.status, StatusCode::BAD_REQUEST);

    let huge = app
        .send(photo(&token, "image/jpeg", vec![0u8; MAX_PHOTO_BYTES + 1]))
        .await;
    assert_eq!(huge.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn failed_photo_insert_leaves_no_file_behind() {
    let app = TestApp::new();
    let me = app.seed_user("me", None);
    let token = app.token_for(&me);
    app.state
        .db
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE photos")?;
            Ok(())
        })
        .unwrap();

    let res = app.send(photo(&token, "image/png", vec![0x89, b'P', b'N', b'G'])).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.error(), "Internal server error");

    let leftovers = std::fs::read_dir(&app.state.config.upload_dir)
        .map(|dir| dir.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn about_edit_waits_for_moderation() {
    let app = TestApp::new();
    let me = app.seed_user("me", None);
    let token = app.token_for(&me);

    let res = app
        .send(user_json(Method::PUT, "/me/about", &token, json!({ "about": "new bio" })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["status"], "PENDING");

    let profile = app.state.db.get_user(&me.id.to_string()).unwrap().unwrap();
    assert!(profile.about.is_none());
    assert_eq!(app.state.db.list_pending_content(10).unwrap().len(), 1);
}

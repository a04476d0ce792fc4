mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use bebaby_security::rate_limit::{RateLimitConfig, RateLimiters};
use bebaby_types::models::{ContentStatus, ContentType, ReportStatus, UserStatus};

use common::*;

async fn manage(app: &TestApp, cookie: &str, report_id: &str, action: &str) -> TestResponse {
    let csrf = app.csrf(cookie).await;
    app.send(admin_json(
        Method::PUT,
        "/admin/manage-report",
        cookie,
        Some(&csrf),
        json!({ "reportId": report_id, "action": action, "adminNotes": "checked" }),
    ))
    .await
}

async fn create_user(app: &TestApp, cookie: &str, email: &str, username: &str) -> TestResponse {
    let csrf = app.csrf(cookie).await;
    app.send(admin_json(
        Method::POST,
        "/admin/users",
        cookie,
        Some(&csrf),
        json!({
            "email": email,
            "username": username,
            "password": "password123",
            "userType": "SUGAR_MOMMY",
        }),
    ))
    .await
}

#[tokio::test]
async fn block_user_end_to_end_then_replay_is_forbidden() {
    let app = TestApp::new();
    app.seed_admin("root");
    let reporter = app.seed_user("reporter", None);
    let reported = app.seed_user("reported", None);
    let report_id = app.report(&reporter, &reported);

    let cookie = app.admin_login("root").await;
    let csrf = app.csrf(&cookie).await;
    let body = json!({ "reportId": report_id, "action": "block_user" });

    let res = app
        .send(admin_json(Method::PUT, "/admin/manage-report", &cookie, Some(&csrf), body.clone()))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.body["report"]["status"], "RESOLVED");
    assert_eq!(res.body["userStatus"], "BANNED");

    let stored = app.state.db.get_report(&report_id).unwrap().unwrap();
    assert_eq!(stored.status, ReportStatus::Resolved);
    let user = app.state.db.get_user(&reported.id.to_string()).unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Banned);

    // The token was consumed by the first request.
    let replay = app
        .send(admin_json(Method::PUT, "/admin/manage-report", &cookie, Some(&csrf), body))
        .await;
    assert_eq!(replay.status, StatusCode::FORBIDDEN);
    assert_eq!(replay.error(), "CSRF token invalid");
}

#[tokio::test]
async fn every_admin_route_rejects_missing_or_forged_sessions() {
    let app = TestApp::new();
    let reporter = app.seed_user("reporter", None);
    let reported = app.seed_user("reported", None);
    let report_id = app.report(&reporter, &reported);
    let photo = app.state.db.create_photo(reported.id, "/uploads/x.jpg").unwrap();
    let users_before = app.state.db.list_users(None, 100, 0).unwrap().len();

    let routes = [
        (Method::POST, "/admin/logout", json!({})),
        (
            Method::PUT,
            "/admin/manage-report",
            json!({ "reportId": report_id, "action": "block_user" }),
        ),
        (Method::DELETE, "/admin/manage-report", json!({ "reportId": report_id })),
        (
            Method::PUT,
            "/admin/moderate-content",
            json!({ "contentId": photo.id, "contentType": "photo", "action": "approve" }),
        ),
        (
            Method::POST,
            "/admin/toggle-premium",
            json!({ "userId": reported.id, "premium": true }),
        ),
        (Method::POST, "/admin/deactivate-user", json!({ "userId": reported.id })),
        (
            Method::POST,
            "/admin/users",
            json!({ "email": "new@example.com", "username": "newbie", "password": "password123", "userType": "SUGAR_BABY" }),
        ),
        (Method::GET, "/admin/users", json!({})),
        (Method::GET, "/admin/reports", json!({})),
        (Method::GET, "/admin/pending-content", json!({})),
    ];

    for (method, uri, body) in routes {
        for cookie in ["", "admin_session=authenticated", "admin_session=deadbeef"] {
            let res = app
                .send(admin_json(method.clone(), uri, cookie, Some("anything"), body.clone()))
                .await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{method} {uri} with {cookie:?}");
            assert_eq!(res.error(), "Unauthorized");
        }
    }

    let report = app.state.db.get_report(&report_id).unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.version, 0);
    let user = app.state.db.get_user(&reported.id.to_string()).unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert!(!user.premium);
    let content = app
        .state
        .db
        .get_content(ContentType::Photo, &photo.id.to_string())
        .unwrap()
        .unwrap();
    assert_eq!(content.status, ContentStatus::Pending);
    assert_eq!(app.state.db.list_users(None, 100, 0).unwrap().len(), users_before);
}

#[tokio::test]
async fn csrf_missing_and_invalid_are_distinguished() {
    let app = TestApp::new();
    app.seed_admin("root");
    let target = app.seed_user("target", None);
    let cookie = app.admin_login("root").await;
    let body = json!({ "userId": target.id, "premium": true });

    let missing = app
        .send(admin_json(Method::POST, "/admin/toggle-premium", &cookie, None, body.clone()))
        .await;
    assert_eq!(missing.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.error(), "CSRF token missing");

    app.csrf(&cookie).await;
    let wrong = app
        .send(admin_json(Method::POST, "/admin/toggle-premium", &cookie, Some("0000"), body))
        .await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
    assert_eq!(wrong.error(), "CSRF token invalid");

    assert!(!app.state.db.get_user(&target.id.to_string()).unwrap().unwrap().premium);

    // Safe methods skip the CSRF check.
    let list = app.send(admin_get("/admin/users", &cookie)).await;
    assert_eq!(list.status, StatusCode::OK);
}

#[tokio::test]
async fn reissuing_csrf_supersedes_the_old_token() {
    let app = TestApp::new();
    app.seed_admin("root");
    let target = app.seed_user("target", None);
    let cookie = app.admin_login("root").await;
    let first = app.csrf(&cookie).await;
    let second = app.csrf(&cookie).await;
    assert_ne!(first, second);

    let body = json!({ "userId": target.id, "premium": true });
    let stale = app
        .send(admin_json(Method::POST, "/admin/toggle-premium", &cookie, Some(&first), body.clone()))
        .await;
    assert_eq!(stale.status, StatusCode::FORBIDDEN);

    let fresh = app
        .send(admin_json(Method::POST, "/admin/toggle-premium", &cookie, Some(&second), body))
        .await;
    assert_eq!(fresh.status, StatusCode::OK);
    assert_eq!(fresh.body["user"]["premium"], true);
}

#[tokio::test]
async fn unknown_action_is_rejected_before_storage() {
    let app = TestApp::new();
    app.seed_admin("root");
    let reporter = app.seed_user("reporter", None);
    let reported = app.seed_user("reported", None);
    let report_id = app.report(&reporter, &reported);
    let cookie = app.admin_login("root").await;
    let csrf = app.csrf(&cookie).await;

    let res = app
        .send(admin_json(
            Method::PUT,
            "/admin/manage-report",
            &cookie,
            Some(&csrf),
            json!({ "reportId": report_id, "action": "nuke" }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Invalid action");
    assert_eq!(app.state.db.get_report(&report_id).unwrap().unwrap().version, 0);
}

#[tokio::test]
async fn review_then_delete_user_then_conflict() {
    let app = TestApp::new();
    let admin = app.seed_admin("root");
    let reporter = app.seed_user("reporter", None);
    let reported = app.seed_user("reported", None);
    let report_id = app.report(&reporter, &reported);
    let cookie = app.admin_login("root").await;

    let review = manage(&app, &cookie, &report_id, "review").await;
    assert_eq!(review.status, StatusCode::OK);
    assert_eq!(review.body["report"]["status"], "PENDING");
    assert_eq!(review.body["report"]["handledBy"], admin.id.to_string());
    assert!(review.body["userStatus"].is_null());

    let delete = manage(&app, &cookie, &report_id, "delete_user").await;
    assert_eq!(delete.status, StatusCode::OK);
    assert_eq!(delete.body["userStatus"], "INACTIVE");

    let again = manage(&app, &cookie, &report_id, "block_user").await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error(), "report already resolved");

    // Soft delete: the row is still there.
    let user = app.state.db.get_user(&reported.id.to_string()).unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Inactive);
}

#[tokio::test]
async fn unknown_report_is_404() {
    let app = TestApp::new();
    app.seed_admin("root");
    let cookie = app.admin_login("root").await;
    let csrf = app.csrf(&cookie).await;
    let res = app
        .send(admin_json(
            Method::PUT,
            "/admin/manage-report",
            &cookie,
            Some(&csrf),
            json!({ "reportId": "r1", "action": "review" }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error(), "report not found");
}

#[tokio::test]
async fn deleting_a_report_keeps_the_user() {
    let app = TestApp::new();
    app.seed_admin("root");
    let reporter = app.seed_user("reporter", None);
    let reported = app.seed_user("reported", None);
    let report_id = app.report(&reporter, &reported);
    let cookie = app.admin_login("root").await;

    let csrf = app.csrf(&cookie).await;
    let res = app
        .send(admin_json(
            Method::DELETE,
            "/admin/manage-report",
            &cookie,
            Some(&csrf),
            json!({ "reportId": report_id }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(app.state.db.get_report(&report_id).unwrap().is_none());
    assert!(app.state.db.get_user(&reported.id.to_string()).unwrap().is_some());

    let csrf = app.csrf(&cookie).await;
    let again = app
        .send(admin_json(
            Method::DELETE,
            "/admin/manage-report",
            &cookie,
            Some(&csrf),
            json!({ "reportId": report_id }),
        ))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_moderation_is_terminal() {
    let app = TestApp::new();
    app.seed_admin("root");
    let owner = app.seed_user("owner", None);
    let text = app
        .state
        .db
        .create_pending_text(owner.id, "about", "new bio")
        .unwrap();
    let cookie = app.admin_login("root").await;

    let pending = app.send(admin_get("/admin/pending-content", &cookie)).await;
    assert_eq!(pending.body.as_array().unwrap().len(), 1);

    let body = json!({ "contentId": text.id, "contentType": "text", "action": "approve" });
    let csrf = app.csrf(&cookie).await;
    let res = app
        .send(admin_json(Method::PUT, "/admin/moderate-content", &cookie, Some(&csrf), body.clone()))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["content"]["status"], "APPROVED");
    let profile = app.state.db.get_user(&owner.id.to_string()).unwrap().unwrap();
    assert_eq!(profile.about.as_deref(), Some("new bio"));

    let csrf = app.csrf(&cookie).await;
    let again = app
        .send(admin_json(Method::PUT, "/admin/moderate-content", &cookie, Some(&csrf), body))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error(), "content already moderated");

    let csrf = app.csrf(&cookie).await;
    let bad_type = app
        .send(admin_json(
            Method::PUT,
            "/admin/moderate-content",
            &cookie,
            Some(&csrf),
            json!({ "contentId": text.id, "contentType": "video", "action": "approve" }),
        ))
        .await;
    assert_eq!(bad_type.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_created_user_conflicts_on_duplicates() {
    let app = TestApp::new();
    app.seed_admin("root");
    app.seed_user("taken", None);
    let cookie = app.admin_login("root").await;

    let created = create_user(&app, &cookie, "fresh@example.com", "fresh").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["user"]["verified"], true);

    let dup_email = create_user(&app, &cookie, "TAKEN@example.com", "other").await;
    assert_eq!(dup_email.status, StatusCode::CONFLICT);
    assert_eq!(dup_email.error(), "email already exists");

    let dup_name = create_user(&app, &cookie, "other@example.com", "taken").await;
    assert_eq!(dup_name.status, StatusCode::CONFLICT);
    assert_eq!(dup_name.error(), "username already exists");
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
    let app = TestApp::new();
    app.seed_admin("root");
    let target = app.seed_user("target", None);
    let cookie = app.admin_login("root").await;
    let csrf = app.csrf(&cookie).await;

    let res = app
        .send(admin_json(
            Method::POST,
            "/admin/deactivate-user",
            &cookie,
            Some(&csrf),
            json!({ "userId": target.id }),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["status"], "INACTIVE");

    let login = app
        .send(json(
            Method::POST,
            "/auth/login",
            json!({ "email": target.email, "password": USER_PASSWORD }),
        ))
        .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    let listed = app.send(admin_get("/admin/users?status=INACTIVE", &cookie)).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
    let bad_filter = app.send(admin_get("/admin/users?status=GONE", &cookie)).await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    app.seed_admin("root");
    let cookie = app.admin_login("root").await;
    let csrf = app.csrf(&cookie).await;

    let res = app
        .send(admin_json(Method::POST, "/admin/logout", &cookie, Some(&csrf), json!({})))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let after = app.send(admin_get("/admin/reports", &cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_admin_credentials_and_non_admins_are_refused() {
    let app = TestApp::new();
    app.seed_admin("root");
    app.seed_user("plain", None);

    let wrong = app
        .send(json(
            Method::POST,
            "/admin/login",
            json!({ "username": "root", "password": "nope-nope" }),
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(cookie_pair(&wrong.headers, "admin_session").is_none());

    let not_admin = app
        .send(json(
            Method::POST,
            "/admin/login",
            json!({ "username": "plain", "password": USER_PASSWORD }),
        ))
        .await;
    assert_eq!(not_admin.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_limiter_returns_429_with_headers() {
    let limiters = RateLimiters::new(
        RateLimiters::DEFAULT_API,
        RateLimitConfig::new(2, 60_000),
        RateLimiters::DEFAULT_UPLOAD,
    );
    let app = TestApp::with_limits(limiters);
    let attempt = || {
        json(
            Method::POST,
            "/admin/login",
            json!({ "username": "ghost", "password": "whatever1" }),
        )
    };

    let first = app.send(attempt()).await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first.headers["x-ratelimit-limit"], "2");
    assert_eq!(first.headers["x-ratelimit-remaining"], "1");

    app.send(attempt()).await;
    let third = app.send(attempt()).await;
    assert_eq!(third.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(third.error(), "Too many requests");
    assert_eq!(third.headers["x-ratelimit-remaining"], "0");
    assert!(third.headers.contains_key("x-ratelimit-reset"));

    // The general limiter is separate.
    let other = app.send(admin_get("/admin/reports", "")).await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

fn login_from(addr: &str) -> axum::http::Request<axum::body::Body> {
    let mut req = json(
        Method::POST,
        "/admin/login",
        json!({ "username": "ghost", "password": "whatever1" }),
    );
    req.headers_mut().insert("x-forwarded-for", addr.parse().unwrap());
    req
}

fn tight_auth_limit() -> RateLimiters {
    RateLimiters::new(
        RateLimiters::DEFAULT_API,
        RateLimitConfig::new(2, 60_000),
        RateLimiters::DEFAULT_UPLOAD,
    )
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_escape_the_limit() {
    let app = TestApp::with_limits(tight_auth_limit());

    let mut limited = 0;
    for i in 0..20 {
        let res = app.send(login_from(&format!("10.0.0.{i}"))).await;
        if res.status == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 18);
    assert_eq!(app.state.limiters.auth.bucket_count(), 1);
}

#[tokio::test]
async fn trusted_proxy_limits_each_forwarded_client() {
    let app = TestApp::behind_proxy(tight_auth_limit());

    for _ in 0..2 {
        let res = app.send(login_from("203.0.113.7")).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let blocked = app.send(login_from("203.0.113.7")).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app.send(login_from("203.0.113.8")).await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_csrf_sets_its_own_cookie() {
    let app = TestApp::new();
    let res = app
        .send(
            axum::http::Request::builder()
                .uri("/admin/csrf")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["csrfToken"].as_str().unwrap().len() == 64);
    assert!(cookie_pair(&res.headers, "csrf_sid").is_some());
}

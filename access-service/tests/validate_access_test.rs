mod common;

use access_service::models::{AccessGrant, Coordinates, Document, GeoFence};
use access_service::services::geo::distance_meters;
use access_service::services::JwtIdentityProvider;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::{reasons, TestApp};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;

const CENTER_LAT: f64 = 40.7128;
const CENTER_LON: f64 = -74.0060;

fn fence() -> GeoFence {
    GeoFence::new(Coordinates::new(CENTER_LAT, CENTER_LON), Some(100.0))
}

#[tokio::test]
async fn unknown_code_is_not_found_and_not_audited() {
    let app = TestApp::new();
    let grant = app.seed(|g| g).await;

    let (status, body) = app
        .post("/access/validate", json!({ "qrCode": "no-such-code" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid or inactive QR code");
    assert!(app.store.attempts_for_grant(&grant.id).await.is_empty());
}

#[tokio::test]
async fn inactive_grant_is_not_found_whatever_its_conditions() {
    let app = TestApp::new();
    let grant = app
        .seed(|g| {
            let mut g = g
                .with_fence(fence())
                .with_expiry(Utc::now() - Duration::hours(1))
                .with_otp_required()
                .with_password("opensesame");
            g.otp_code = Some("123456".to_string());
            g.otp_expires_at = Some(Utc::now() + Duration::minutes(5));
            g.active = false;
            g
        })
        .await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({
                "qrCode": grant.code,
                "latitude": CENTER_LAT,
                "longitude": CENTER_LON,
                "otpCode": "123456",
                "password": "opensesame"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid or inactive QR code");
    assert!(app.store.attempts_for_grant(&grant.id).await.is_empty());
    assert_eq!(app.analyzer.calls(), 0);
}

#[tokio::test]
async fn grant_without_document_row_is_not_found() {
    let app = TestApp::new();
    let grant = AccessGrant::new("document-that-was-never-stored", "orphan-code");
    app.store.insert_grant(grant.clone()).await;

    let (status, body) = app
        .post("/access/validate", json!({ "qrCode": grant.code }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid or inactive QR code");
    assert!(app.store.attempts_for_grant(&grant.id).await.is_empty());
}

#[tokio::test]
async fn unconditional_grant_releases_document() {
    let app = TestApp::new();
    let grant = app.seed(|g| g).await;

    let (status, body) = app
        .post("/access/validate", json!({ "qrCode": grant.code }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["documentId"], grant.document_id.as_str());
    assert_eq!(body["storagePath"], "documents/report.pdf");
    assert_eq!(body["filename"], "report.pdf");
    assert!(reasons(&body).is_empty());

    let attempts = app.store.attempts_for_grant(&grant.id).await;
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].granted);
    assert!(attempts[0].denial_reason.is_none());
    assert_eq!(app.analyzer.calls(), 0);
}

#[tokio::test]
async fn viewer_inside_fence_is_granted() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_fence(fence())).await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "latitude": 40.7130, "longitude": -74.0062 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn viewer_outside_fence_gets_distance() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_fence(fence())).await;
    let (lat, lon) = (40.7200, -74.0060);
    let expected = distance_meters(CENTER_LAT, CENTER_LON, lat, lon).round() as i64;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "latitude": lat, "longitude": lon }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert!(body["documentId"].is_null());
    assert!(body["storagePath"].is_null());
    assert_eq!(
        reasons(&body),
        vec![format!("Location outside allowed radius ({}m away)", expected)]
    );
}

#[tokio::test]
async fn partial_location_counts_as_missing() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_fence(fence())).await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "latitude": CENTER_LAT }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        reasons(&body),
        vec!["Location verification required but not provided"]
    );
}

#[tokio::test]
async fn every_failing_rule_is_reported_in_order() {
    let app = TestApp::new();
    let mut document = Document::new("plan.pdf", "documents/plan.pdf");
    document.active = false;
    let grant = app
        .seed_with_document(document, |g| {
            g.with_expiry(Utc::now() - Duration::hours(1))
                .with_fence(fence())
                .with_otp_required()
                .with_password("opensesame")
        })
        .await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "password": "wrong" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        reasons(&body),
        vec![
            "Document is no longer active",
            "QR code has expired",
            "Location verification required but not provided",
            "OTP required but not provided",
            "Invalid password",
        ]
    );

    let attempts = app.store.attempts_for_grant(&grant.id).await;
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].granted);
    assert_eq!(attempts[0].denial_reasons(), reasons(&body));
}

#[tokio::test]
async fn empty_password_is_treated_as_missing() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_password("opensesame")).await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "password": "" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reasons(&body), vec!["Password required but not provided"]);
}

#[tokio::test]
async fn whitespace_password_is_compared_verbatim() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_password("   ")).await;

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "password": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reasons(&body).is_empty());

    let (status, body) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "password": " " }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reasons(&body), vec!["Invalid password"]);
}

#[tokio::test]
async fn correct_password_is_granted() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_password("opensesame")).await;

    let (status, _) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "password": "opensesame" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_fence(fence())).await;

    let (status, _) = app
        .post(
            "/access/validate",
            json!({ "qrCode": grant.code, "latitude": 120.0, "longitude": 0.0 }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.store.attempts_for_grant(&grant.id).await.is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/access/validate")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn audit_row_carries_client_metadata_and_identity() {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }

    let app = TestApp::with_identity(Arc::new(JwtIdentityProvider::new("test-secret")));
    let grant = app.seed(|g| g).await;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: "viewer-7",
            exp: Utc::now().timestamp() + 600,
        },
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/access/validate")
                .header("content-type", "application/json")
                .header("user-agent", "scanner/1.0")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::from(json!({ "qrCode": grant.code }).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let attempt = app.store.attempts_for_grant(&grant.id).await.remove(0);
    assert_eq!(attempt.user_agent.as_deref(), Some("scanner/1.0"));
    assert_eq!(attempt.source_addr.as_deref(), Some("203.0.113.9"));
    assert_eq!(attempt.viewer_id.as_deref(), Some("viewer-7"));
}

#[tokio::test]
async fn invalid_bearer_does_not_affect_verdict() {
    let app = TestApp::with_identity(Arc::new(JwtIdentityProvider::new("test-secret")));
    let grant = app.seed(|g| g).await;

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/access/validate")
                .header("content-type", "application/json")
                .header("authorization", "Bearer garbage")
                .body(Body::from(json!({ "qrCode": grant.code }).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let attempt = app.store.attempts_for_grant(&grant.id).await.remove(0);
    assert!(attempt.viewer_id.is_none());
}

#[tokio::test]
async fn denial_attaches_analyzer_alert_to_the_attempt() {
    let app = TestApp::new();
    let grant = app.seed(|g| g.with_password("opensesame")).await;

    let (status, _) = app
        .post("/access/validate", json!({ "qrCode": grant.code }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let attempt = app.wait_for_alert(&grant.id).await;
    let message = attempt.alert_message.unwrap();
    assert!(message.starts_with("Mock alert"));
    assert!(message.contains("Password required but not provided"));
    assert_eq!(app.analyzer.calls(), 1);
}

#[tokio::test]
async fn failed_analyzer_still_marks_alert_with_fallback() {
    let app = TestApp::with_analyzer(access_service::services::MockAnalyzer::failing());
    let grant = app.seed(|g| g.with_expiry(Utc::now() - Duration::minutes(5))).await;

    let (status, _) = app
        .post("/access/validate", json!({ "qrCode": grant.code }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let attempt = app.wait_for_alert(&grant.id).await;
    assert_eq!(
        attempt.alert_message.as_deref(),
        Some("Security Alert: Unauthorized access attempt blocked. Reasons: QR code has expired")
    );
}

#[tokio::test]
async fn slow_analyzer_does_not_delay_the_verdict() {
    let app = TestApp::with_analyzer(access_service::services::MockAnalyzer::stalled(
        std::time::Duration::from_secs(30),
    ));
    let grant = app.seed(|g| g.with_password("opensesame")).await;

    let started = std::time::Instant::now();
    let (status, _) = app
        .post("/access/validate", json!({ "qrCode": grant.code }))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));

    // Analyzer timeout falls back
    let attempt = app.wait_for_alert(&grant.id).await;
    assert!(attempt
        .alert_message
        .unwrap()
        .starts_with("Security Alert: Unauthorized access attempt blocked."));
}

#[tokio::test]
async fn audit_failure_does_not_block_the_decision() {
    let app = TestApp::with_failing_audit();
    let granted = app.seed(|g| g).await;
    let denied = app.seed(|g| g.with_password("opensesame")).await;

    let (status, body) = app
        .post("/access/validate", json!({ "qrCode": granted.code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .post("/access/validate", json!({ "qrCode": denied.code }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reasons(&body), vec!["Password required but not provided"]);
}

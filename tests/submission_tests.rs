
use std::sync::Arc;

use chrono::Duration;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use test_utils::*;

fn contact_form() -> Value {
    json!({
        "name": "John Doe",
        "email": "john@example.com",
        "message": "Hello, I'd like to talk about a project."
    })
}

#[actix_rt::test]
async fn valid_submission_returns_receipt_and_sends_email() {
    let app = TestApp::spawn().await;

    let response = app.submit(&contact_form()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        ALLOWED_ORIGIN
    );

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Form submitted successfully");
    assert_eq!(body["submissionId"].as_str().unwrap().len(), 8);

    let sent = app.outbox.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Form submission from John Doe");
    assert_eq!(sent[0].from, "noreply@example.com");
    assert!(sent[0].text.contains("IP Address: 203.0.113.10"));
    assert!(sent[0].text.contains("User Agent: Mozilla (Integration Test)"));
}

#[actix_rt::test]
async fn same_content_yields_same_submission_id() {
    let app = TestApp::spawn().await;

    let first: Value = app.submit(&contact_form()).await.json().await.unwrap();
    let second: Value = app
        .submit(&json!({
            "NAME": "  John Doe ",
            "Email": "john@example.com",
            "message": "Hello, I'd like to talk about a project.  "
        }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(first["submissionId"], second["submissionId"]);
}

#[actix_rt::test]
async fn validation_failure_returns_details() {
    let app = TestApp::spawn().await;

    let response = app
        .submit(&json!({ "name": "John Doe", "email": "not-an-email" }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["message"], "Invalid form data");
    assert_eq!(
        body["details"],
        json!([{ "field": "email", "message": "must match format \"email\"" }])
    );
    assert!(app.outbox.sent.lock().is_empty());
}

#[actix_rt::test]
async fn script_injection_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .submit(&json!({
            "name": "<script>alert(\"xss\")</script>",
            "email": "john@example.com",
            "message": "Hello"
        }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "name");
    assert_eq!(body["details"][0]["message"], "Suspicious content detected");
}

#[actix_rt::test]
async fn null_well_known_field_is_rejected_but_long_extras_pass() {
    let app = TestApp::spawn().await;

    let response = app.submit(&json!({ "name": null, "message": "Hello" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"], json!([{ "field": "name", "message": "must be string" }]));

    let response = app
        .submit(&json!({ "message": "Hello", "comments": "c".repeat(1500) }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn empty_body_fails_validation() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url())
        .header("Origin", ALLOWED_ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "root");
}

#[actix_rt::test]
async fn fourth_identical_submission_is_blocked() {
    let app = TestApp::spawn().await;

    for i in 0..3 {
        let response = app.submit_from(&format!("198.51.100.{i}"), &contact_form()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.submit_from("198.51.100.99", &contact_form()).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get("retry-after").unwrap(), "86400");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Too many requests");
    assert_eq!(body["message"], "This submission has been received too many times");
    assert_eq!(body["retryAfter"], 86400);
    assert_eq!(app.outbox.sent.lock().len(), 3);
}

#[actix_rt::test]
async fn eleventh_request_is_rate_limited_until_next_window() {
    let app = TestApp::spawn().await;

    for i in 0..10 {
        let response = app.submit(&json!({ "message": format!("Message number {i}") })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.submit(&json!({ "message": "One too many" })).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["message"], "Too many requests from this IP");
    assert_eq!(body["retryAfter"], 3600);

    // Other clients are unaffected.
    let response = app.submit_from("192.0.2.50", &json!({ "message": "Different sender" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance(Duration::hours(1));
    let response = app.submit(&json!({ "message": "A new window" })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn non_post_methods_are_not_allowed() {
    let app = TestApp::spawn().await;

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = app
            .client
            .request(method.clone(), app.url())
            .header("Origin", ALLOWED_ORIGIN)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Only POST requests are allowed");
    }
}

#[actix_rt::test]
async fn disallowed_or_missing_origin_is_forbidden() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url())
        .header("Origin", "https://evil.com")
        .json(&contact_form())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["message"], "Origin not allowed");

    let response = app.client.post(app.url()).json(&contact_form()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(app.outbox.sent.lock().is_empty());
}

#[actix_rt::test]
async fn wildcard_subdomain_origin_is_allowed() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url())
        .header("Origin", "https://forms.example.org")
        .json(&contact_form())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn malformed_json_returns_400() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url())
        .header("Origin", ALLOWED_ORIGIN)
        .header("Content-Type", "application/json")
        .body("{\"name\": \"John\",")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON");
    assert_eq!(body["message"], "Request body must be valid JSON");
}

#[actix_rt::test]
async fn email_failure_returns_generic_500() {
    let app = TestApp::spawn_with(Arc::new(RecordingEmailSender::failing())).await;

    let response = app.submit(&contact_form()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "An error occurred while processing your submission");
}

#[actix_rt::test]
async fn cors_preflight_is_answered() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .request(Method::OPTIONS, app.url())
        .header("Origin", ALLOWED_ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(response.headers().get("access-control-max-age").unwrap(), "600");
}

#[actix_rt::test]
async fn health_reports_store_kind() {
    let app = TestApp::spawn().await;

    let response = app.client.get(format!("{}/health", app.address)).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["store_status"], "OK");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

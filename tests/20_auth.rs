mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{LOGIN_MAX_ATTEMPTS, SUPERADMIN_PASSWORD, SUPERADMIN_USERNAME};

#[tokio::test]
async fn login_requires_username_and_password() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.post(server.url("/api/auth/login")).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn superadmin_session_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::session_client()?;

    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": SUPERADMIN_USERNAME, "password": SUPERADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        res.headers().get(reqwest::header::SET_COOKIE).is_some(),
        "login must set the session cookie"
    );
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["role"], "superadmin");
    assert_eq!(body["data"]["user"]["username"], SUPERADMIN_USERNAME);

    let me: Value = client.get(server.url("/api/auth/me")).send().await?.json().await?;
    assert_eq!(me["success"], true);
    assert_eq!(me["data"]["id"], "superadmin");
    assert_eq!(me["data"]["userProfile"]["startPage"], "/system-setup");
    assert_eq!(me["data"]["userProfile"]["sidebar"]["showSystemSetup"], true);

    let res = client.post(server.url("/api/auth/heartbeat")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let heartbeat: Value = res.json().await?;
    assert_eq!(heartbeat["data"]["active"], true);
    assert!(heartbeat["data"]["expiresAt"].is_string());

    let res = client.post(server.url("/api/auth/logout")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url("/api/auth/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn wrong_superadmin_password_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/auth/superadmin-login"))
        .json(&json!({ "username": "wrong-password-user", "password": "not-it" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn repeated_failures_are_rate_limited() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let attempt = json!({ "username": "rate-limited-user", "password": "guess" });

    for _ in 0..LOGIN_MAX_ATTEMPTS {
        let res = client.post(server.url("/api/auth/superadmin-login")).json(&attempt).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client.post(server.url("/api/auth/superadmin-login")).json(&attempt).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().get(reqwest::header::RETRY_AFTER).is_some());

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
    assert!(body["retry_after"].as_u64().is_some());
    Ok(())
}

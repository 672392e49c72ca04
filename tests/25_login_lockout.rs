mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{LOGIN_MAX_ATTEMPTS, SUPERADMIN_PASSWORD, SUPERADMIN_USERNAME};

// Locks out the env superadmin, so it runs against its own server

#[tokio::test]
async fn wrong_password_for_superadmin_name_locks_the_account() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let attempt = json!({ "username": SUPERADMIN_USERNAME, "password": "not-it" });

    for _ in 0..LOGIN_MAX_ATTEMPTS {
        let res = client.post(server.url("/api/auth/login")).json(&attempt).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": SUPERADMIN_USERNAME, "password": SUPERADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().get(reqwest::header::RETRY_AFTER).is_some());
    Ok(())
}

#[tokio::test]
async fn unreachable_database_still_counts_failed_logins() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let attempt = json!({ "username": "offline-user", "password": "guess" });

    for _ in 0..LOGIN_MAX_ATTEMPTS {
        let res = client.post(server.url("/api/auth/login")).json(&attempt).send().await?;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    let res = client.post(server.url("/api/auth/login")).json(&attempt).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
    Ok(())
}

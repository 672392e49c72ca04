mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn protected_routes_need_a_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in ["/api/objects", "/api/settings", "/api/temperature-analysis", "/api/grafana/config"] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} without a cookie", path);
        let body: Value = res.json().await?;
        assert_eq!(body["error"], "Not authenticated");
    }
    Ok(())
}

#[tokio::test]
async fn forged_cookie_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/api/auth/me"))
        .header(reqwest::header::COOKIE, "sid=00ff00ff")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn grafana_url_uses_fallback_config() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::superadmin_client(server).await?;

    let res = client
        .get(server.url("/api/grafana/url?panelId=3&meterId=4711&timeRange=30d"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let url = body["data"]["url"].as_str().unwrap_or_default();
    assert!(url.starts_with("https://graf.heatcare.one/d-solo/"), "{}", url);
    assert!(url.contains("panelId=3"));
    assert!(url.contains("var-id=4711"));
    assert!(url.contains("from=now-30d"));
    assert_eq!(body["data"]["timeRange"], "now-30d");
    Ok(())
}

#[tokio::test]
async fn grafana_url_requires_panel_id() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::superadmin_client(server).await?;

    let res = client.get(server.url("/api/grafana/url?meterId=1")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["panelId"].is_string());
    Ok(())
}

#[tokio::test]
async fn data_routes_report_unavailable_database() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = common::superadmin_client(server).await?;

    let res = client.get(server.url("/api/objects")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = client.get(server.url("/api/temperature-analysis/not-a-number")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid object ID");
    Ok(())
}

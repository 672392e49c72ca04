use anyhow::{anyhow, Context};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{json, Value};

/// Thin session-cookie client for the portal API
pub struct PortalClient {
    base_url: String,
    http: Client,
}

impl PortalClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in; the session cookie stays in the client's cookie store
    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<Value> {
        self.post("/api/auth/login", &json!({ "username": username, "password": password }))
            .await
            .context("login failed")
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::data(response).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> anyhow::Result<Value> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::data(response).await
    }

    async fn data(response: Response) -> anyhow::Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(anyhow!("{} ({})", message, status));
        }
        Ok(body.get("data").cloned().unwrap_or(body))
    }
}

#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

pub const SUPERADMIN_USERNAME: &str = "root-admin";
pub const SUPERADMIN_PASSWORD: &str = "integration-secret";
/// Failed logins allowed per username before 429
pub const LOGIN_MAX_ATTEMPTS: u32 = 3;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory sessions and env superadmin credentials: auth flows run without Postgres
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_netzwaechter-portal"));
        cmd.env("PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("SESSION_STORE", "memory")
            .env("SUPERADMIN_USERNAME", SUPERADMIN_USERNAME)
            .env("SUPERADMIN_PASSWORD", SUPERADMIN_PASSWORD)
            .env("SETUP_APP_PATH", "target/nonexistent-setup-app.json")
            .env("DATABASE_RUN_MIGRATIONS", "false")
            .env("SECURITY_SECURE_COOKIES", "false")
            .env("SECURITY_LOGIN_MAX_ATTEMPTS", LOGIN_MAX_ATTEMPTS.to_string())
            .env("RUST_LOG", "netzwaechter_portal=warn")
            .env_remove("DATABASE_URL")
            .env_remove("NETZWAECHTER_PORT")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Without a database the portal reports 503 but is serving
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Client that keeps the session cookie between requests
pub fn session_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().cookie_store(true).build()?)
}

/// Log in as the env superadmin on a fresh cookie-keeping client
pub async fn superadmin_client(server: &TestServer) -> Result<reqwest::Client> {
    let client = session_client()?;
    let res = client
        .post(server.url("/api/auth/superadmin-login"))
        .json(&serde_json::json!({
            "username": SUPERADMIN_USERNAME,
            "password": SUPERADMIN_PASSWORD,
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "superadmin login failed: {}", res.status());
    Ok(client)
}

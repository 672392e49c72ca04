// auth/superadmin.rs - built-in superadmin accounts (env vars or setup-app file)

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use super::AuthError;
use crate::config::SuperadminSource;

pub const SUPERADMIN_ID: &str = "superadmin";
pub const SUPERADMIN_EMAIL: &str = "superadmin@system.local";

/// Shape of `setup-app.json` (YAML is accepted too)
#[derive(Debug, Deserialize)]
struct SetupFile {
    #[serde(rename = "Login-user")]
    login_user: Option<LoginUserSection>,
    #[serde(rename = "Superadmin", default)]
    superadmin: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LoginUserSection {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    check_superadmin: bool,
}

#[derive(Clone, Default)]
pub struct SuperadminCredentials {
    accounts: Vec<(String, String)>,
}

impl std::fmt::Debug for SuperadminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.accounts.iter().map(|(u, _)| u.as_str()).collect();
        f.debug_struct("SuperadminCredentials").field("accounts", &names).finish()
    }
}

impl SuperadminCredentials {
    /// Collect accounts from the setup file (when it enables superadmin login) and from env.
    /// A missing file is not an error.
    pub fn load(source: &SuperadminSource) -> Result<Self, AuthError> {
        let mut credentials = Self::default();

        let path = Path::new(&source.setup_file);
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| AuthError::SetupFile {
                path: source.setup_file.clone(),
                reason: e.to_string(),
            })?;
            let yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            credentials = Self::from_setup_str(&content, yaml).map_err(|reason| AuthError::SetupFile {
                path: source.setup_file.clone(),
                reason,
            })?;
        }

        if let (Some(user), Some(pass)) = (&source.username, &source.password) {
            credentials.accounts.push((user.clone(), pass.clone()));
        }

        Ok(credentials)
    }

    pub fn from_setup_str(content: &str, yaml: bool) -> Result<Self, String> {
        let file: SetupFile = if yaml {
            serde_yaml::from_str(content).map_err(|e| e.to_string())?
        } else {
            serde_json::from_str(content).map_err(|e| e.to_string())?
        };

        let enabled = file
            .login_user
            .as_ref()
            .map(|l| l.enabled && l.check_superadmin)
            .unwrap_or(false);
        if !enabled {
            return Ok(Self::default());
        }

        let accounts = file
            .superadmin
            .into_iter()
            .flat_map(|entry| entry.into_iter())
            .filter(|(user, pass)| !user.is_empty() && !pass.is_empty())
            .collect();
        Ok(Self { accounts })
    }

    pub fn with_account(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.push((username.into(), password.into()));
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Checks every account so timing does not reveal which names exist
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.accounts.iter().fold(false, |matched, (user, pass)| {
            let hit = constant_time_eq(user, username) & constant_time_eq(pass, password);
            matched | hit
        })
    }

    /// Whether `username` names a superadmin account, regardless of password
    pub fn has_account(&self, username: &str) -> bool {
        self.accounts
            .iter()
            .fold(false, |matched, (user, _)| matched | constant_time_eq(user, username))
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.iter().zip(db.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP_JSON: &str = r#"{
        "Login-user": {"enabled": true, "check_superadmin": true},
        "Superadmin": [{"root": "s3cret"}, {"ops": "hunter22"}]
    }"#;

    #[test]
    fn reads_enabled_setup_file() {
        let creds = SuperadminCredentials::from_setup_str(SETUP_JSON, false).unwrap();
        assert_eq!(creds.len(), 2);
        assert!(creds.verify("root", "s3cret"));
        assert!(creds.verify("ops", "hunter22"));
        assert!(!creds.verify("root", "hunter22"));
        assert!(!creds.verify("nobody", "s3cret"));
    }

    #[test]
    fn disabled_setup_file_yields_no_accounts() {
        let content = SETUP_JSON.replace("\"check_superadmin\": true", "\"check_superadmin\": false");
        let creds = SuperadminCredentials::from_setup_str(&content, false).unwrap();
        assert!(!creds.is_configured());
        assert!(!creds.verify("root", "s3cret"));
    }

    #[test]
    fn reads_yaml_setup_file() {
        let yaml = "Login-user:\n  enabled: true\n  check_superadmin: true\nSuperadmin:\n  - admin: pw123456\n";
        let creds = SuperadminCredentials::from_setup_str(yaml, true).unwrap();
        assert!(creds.verify("admin", "pw123456"));
    }

    #[test]
    fn env_account_is_added() {
        let source = SuperadminSource {
            username: Some("envroot".into()),
            password: Some("envpass".into()),
            setup_file: "/nonexistent/setup-app.json".into(),
        };
        let creds = SuperadminCredentials::load(&source).unwrap();
        assert!(creds.verify("envroot", "envpass"));
        assert!(!format!("{:?}", creds).contains("envpass"));
    }

    #[test]
    fn account_names_are_known_without_password() {
        let creds = SuperadminCredentials::default().with_account("root", "s3cret");
        assert!(creds.has_account("root"));
        assert!(!creds.has_account("anna"));
        assert!(!SuperadminCredentials::default().has_account("root"));
    }

    #[test]
    fn malformed_setup_file_is_reported() {
        assert!(SuperadminCredentials::from_setup_str("{not json", false).is_err());
    }
}

/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portal roles, stored as lowercase strings in `users.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    /// Admins and superadmins share the elevated permission set
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }

    /// Lenient parse for values read back from the database.
    /// Unknown roles fall back to the least privileged one.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Role::User)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Mandant ids a request may see. `All` is the admin view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MandantScope {
    All,
    Only(Vec<i32>),
}

impl MandantScope {
    pub fn allows(&self, mandant_id: Option<i32>) -> bool {
        match (self, mandant_id) {
            (MandantScope::All, _) => true,
            (MandantScope::Only(ids), Some(id)) => ids.contains(&id),
            (MandantScope::Only(_), None) => false,
        }
    }
}

/// Parse a JSON `mandant_access` column into ids. Accepts numbers and numeric strings.
pub fn mandant_ids_from_json(value: Option<&serde_json::Value>) -> Vec<i32> {
    let Some(serde_json::Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_roles_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::from_db("superadmin"), Role::Superadmin);
        assert_eq!(Role::from_db("viewer"), Role::User);
        assert!(Role::Superadmin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn mandant_access_accepts_mixed_values() {
        let value = json!([1, "2", "x", null, 3.5]);
        assert_eq!(mandant_ids_from_json(Some(&value)), vec![1, 2]);
        assert!(mandant_ids_from_json(Some(&json!({"a": 1}))).is_empty());
        assert!(mandant_ids_from_json(None).is_empty());
    }

    #[test]
    fn scope_checks_membership() {
        let scope = MandantScope::Only(vec![4, 7]);
        assert!(scope.allows(Some(7)));
        assert!(!scope.allows(Some(5)));
        assert!(!scope.allows(None));
        assert!(MandantScope::All.allows(None));
    }
}

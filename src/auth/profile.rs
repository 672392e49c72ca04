// auth/profile.rs - "who am I" payloads and role default sidebars

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::SessionUser;
use super::superadmin::{SUPERADMIN_EMAIL, SUPERADMIN_ID};
use crate::database::models::UserProfile;
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarConfig {
    pub show_system_setup: bool,
    pub show_logbook: bool,
    pub show_dashboard: bool,
    pub show_energy_data: bool,
    pub show_network_monitor: bool,
    pub show_user_management: bool,
    pub show_object_management: bool,
    pub show_grafana_dashboards: bool,
    pub show_efficiency_strategy: bool,
}

impl SidebarConfig {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Superadmin => Self {
                show_system_setup: true,
                show_logbook: false,
                show_dashboard: false,
                show_energy_data: false,
                show_network_monitor: false,
                show_user_management: false,
                show_object_management: false,
                show_grafana_dashboards: false,
                show_efficiency_strategy: false,
            },
            Role::Admin => Self {
                show_system_setup: false,
                show_logbook: true,
                show_dashboard: true,
                show_energy_data: true,
                show_network_monitor: true,
                show_user_management: true,
                show_object_management: true,
                show_grafana_dashboards: true,
                show_efficiency_strategy: true,
            },
            Role::User => Self {
                show_user_management: false,
                show_object_management: false,
                ..Self::for_role(Role::Admin)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Option<i32>,
    pub name: String,
    pub start_page: String,
    pub sidebar: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserResponse {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub user_profile_id: Option<i32>,
    pub mandant_id: Option<i32>,
    pub mandant_access: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<ProfileView>,
}

fn sidebar_value(role: Role) -> Value {
    serde_json::to_value(SidebarConfig::for_role(role)).unwrap_or(Value::Null)
}

impl AuthUserResponse {
    /// Login payload: identity only, no profile
    pub fn login(user: &SessionUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            user_profile_id: user.user_profile_id,
            mandant_id: user.mandant_id,
            mandant_access: user.mandant_access.clone(),
            user_profile: None,
        }
    }

    pub fn superadmin(username: &str) -> Self {
        Self {
            id: SUPERADMIN_ID.to_string(),
            username: username.to_string(),
            email: Some(SUPERADMIN_EMAIL.to_string()),
            first_name: Some("Super".to_string()),
            last_name: Some("Admin".to_string()),
            role: Role::Superadmin,
            user_profile_id: None,
            mandant_id: None,
            mandant_access: Vec::new(),
            user_profile: Some(ProfileView {
                id: None,
                name: "Superadmin".to_string(),
                start_page: "/system-setup".to_string(),
                sidebar: sidebar_value(Role::Superadmin),
            }),
        }
    }

    /// Full `/api/auth/me` payload. A stored profile wins; otherwise role defaults apply.
    pub fn current(user: &SessionUser, profile: Option<&UserProfile>) -> Self {
        if user.is_superadmin() {
            return Self::superadmin(&user.username);
        }

        let view = match profile {
            Some(profile) => ProfileView {
                id: Some(profile.id),
                name: profile.name.clone(),
                start_page: if profile.start_page.is_empty() {
                    "/dashboard".to_string()
                } else {
                    profile.start_page.clone()
                },
                sidebar: profile
                    .sidebar
                    .clone()
                    .filter(Value::is_object)
                    .unwrap_or_else(|| sidebar_value(user.role)),
            },
            None => ProfileView {
                id: None,
                name: if user.role == Role::Admin { "Default Admin" } else { "Standard User" }.to_string(),
                start_page: "/dashboard".to_string(),
                sidebar: sidebar_value(user.role),
            },
        };

        Self {
            user_profile: Some(view),
            ..Self::login(user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_user;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn role_sidebars() {
        let admin = SidebarConfig::for_role(Role::Admin);
        assert!(!admin.show_system_setup);
        assert!(admin.show_user_management && admin.show_object_management);

        let user = SidebarConfig::for_role(Role::User);
        assert!(!user.show_user_management && !user.show_object_management);
        assert!(user.show_network_monitor);

        let root = SidebarConfig::for_role(Role::Superadmin);
        assert!(root.show_system_setup);
        assert!(!root.show_dashboard);
    }

    #[test]
    fn superadmin_profile_starts_at_system_setup() {
        let me = AuthUserResponse::current(&SessionUser::superadmin("root"), None);
        let profile = me.user_profile.unwrap();
        assert_eq!(profile.start_page, "/system-setup");
        assert_eq!(profile.sidebar["showSystemSetup"], true);
        assert_eq!(me.email.as_deref(), Some("superadmin@system.local"));
    }

    #[test]
    fn stored_profile_overrides_defaults() {
        let stored = UserProfile {
            id: 9,
            name: "Techniker".into(),
            start_page: "/network-monitor".into(),
            sidebar: Some(json!({"showDashboard": false})),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let me = AuthUserResponse::current(&session_user(Role::User, Some(2), vec![]), Some(&stored));
        let profile = me.user_profile.unwrap();
        assert_eq!(profile.id, Some(9));
        assert_eq!(profile.start_page, "/network-monitor");
        assert_eq!(profile.sidebar, json!({"showDashboard": false}));
    }

    #[test]
    fn missing_profile_falls_back_to_role() {
        let me = AuthUserResponse::current(&session_user(Role::Admin, Some(2), vec![]), None);
        let profile = me.user_profile.unwrap();
        assert_eq!(profile.name, "Default Admin");
        assert_eq!(profile.sidebar["showUserManagement"], true);
    }
}

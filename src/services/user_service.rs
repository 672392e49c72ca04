use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::password::{hash_password, validate_new_password, verify_password};
use crate::auth::SessionUser;
use crate::config::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::user::USER_COLUMNS;
use crate::database::models::User;
use crate::types::{MandantScope, Role};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub mandant_id: Option<i32>,
    pub mandant_access: Option<Vec<i32>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_profile_id: Option<i32>,
    pub address: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub mandant_id: Option<i32>,
    pub mandant_access: Option<Vec<i32>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_profile_id: Option<i32>,
    pub address: Option<Value>,
}

impl UserPatch {
    fn touches_permissions(&self) -> bool {
        self.role.is_some() || self.mandant_id.is_some() || self.mandant_access.is_some()
    }

    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && !self.touches_permissions()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.user_profile_id.is_none()
            && self.address.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

fn normalize_email(email: Option<String>) -> ServiceResult<Option<String>> {
    match email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
        Some(email) if !email.contains('@') => Err(ServiceError::field("email", "email is not valid")),
        other => Ok(other),
    }
}

/// Mandants whose users an admin administers: their own plus explicit grants
fn administered(actor: &SessionUser) -> MandantScope {
    MandantScope::Only(actor.accessible_mandants())
}

/// Whether `actor` may read or edit the account `target`
pub fn can_manage(actor: &SessionUser, target: &User) -> bool {
    if actor.id == target.id {
        return true;
    }
    match actor.role {
        Role::Superadmin => true,
        Role::Admin => target.role() != Role::Superadmin && administered(actor).allows(target.mandant_id),
        Role::User => false,
    }
}

/// Extra mandant grants must stay inside what the actor administers
pub fn check_mandant_grants(actor: &SessionUser, mandant_ids: &[i32]) -> ServiceResult<()> {
    if actor.is_superadmin() {
        return Ok(());
    }
    let scope = administered(actor);
    match mandant_ids.iter().find(|id| !scope.allows(Some(**id))) {
        Some(id) => Err(ServiceError::Forbidden(format!("No access to mandant {}", id))),
        None => Ok(()),
    }
}

/// Role and mandant changes a patch may carry for this actor
fn check_patch_permissions(actor: &SessionUser, patch: &UserPatch) -> ServiceResult<()> {
    if !patch.touches_permissions() {
        return Ok(());
    }
    if !actor.is_admin() {
        return Err(ServiceError::Forbidden("Only administrators can change role or mandant".to_string()));
    }
    if let Some(role) = patch.role {
        check_role_grant(actor, role)?;
    }
    if let Some(mandant_id) = patch.mandant_id {
        check_mandant_grants(actor, &[mandant_id])?;
    }
    if let Some(access) = &patch.mandant_access {
        check_mandant_grants(actor, access)?;
    }
    Ok(())
}

/// Only a superadmin hands out the superadmin role
pub fn check_role_grant(actor: &SessionUser, role: Role) -> ServiceResult<()> {
    if role == Role::Superadmin && actor.role != Role::Superadmin {
        return Err(ServiceError::Forbidden("Only a superadmin can grant the superadmin role".to_string()));
    }
    Ok(())
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    /// Login lookup by username or email, case-insensitive
    pub async fn find_for_login(&self, identifier: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(username) = lower($1) OR lower(email) = lower($1) \
             ORDER BY (lower(username) = lower($1)) DESC LIMIT 1",
            USER_COLUMNS
        ))
        .bind(identifier.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self, actor: &SessionUser) -> ServiceResult<Vec<User>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users WHERE 1=1", USER_COLUMNS));
        match actor.role {
            Role::Superadmin => {}
            Role::Admin => {
                builder
                    .push(" AND (mandant_id = ANY(")
                    .push_bind(actor.accessible_mandants())
                    .push(") OR id = ")
                    .push_bind(actor.id.clone())
                    .push(")");
            }
            Role::User => {
                builder.push(" AND id = ").push_bind(actor.id.clone());
            }
        }
        builder.push(" ORDER BY username");
        Ok(builder.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    async fn load(&self, id: &str) -> ServiceResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    pub async fn get(&self, id: &str, actor: &SessionUser) -> ServiceResult<User> {
        let user = self.load(id).await?;
        if !can_manage(actor, &user) {
            return Err(ServiceError::Forbidden("No access to this user".to_string()));
        }
        Ok(user)
    }

    pub async fn create(&self, input: NewUser, actor: &SessionUser) -> ServiceResult<User> {
        let username = input
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ServiceError::field("username", "username is required"))?;
        let password = input
            .password
            .ok_or_else(|| ServiceError::field("password", "password is required"))?;
        validate_new_password(&password).map_err(|m| ServiceError::field("password", m))?;
        let email = normalize_email(input.email)?;
        let role = input.role.unwrap_or_default();
        check_role_grant(actor, role)?;
        let mandant_id = input.mandant_id.or(actor.mandant_id);
        if actor.role == Role::Admin && !administered(actor).allows(mandant_id) {
            return Err(ServiceError::Forbidden("Users can only be created within your mandants".to_string()));
        }
        if let Some(access) = &input.mandant_access {
            check_mandant_grants(actor, access)?;
        }

        self.ensure_unique(&username, email.as_deref(), None).await?;

        let hash = hash_password(&password, config().security.bcrypt_cost).await?;
        let mandant_access = serde_json::to_value(input.mandant_access.unwrap_or_default())
            .unwrap_or_else(|_| Value::Array(Vec::new()));

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password, role, mandant_id, first_name, last_name, \
             user_profile_id, address, mandant_access, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now()) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&username)
        .bind(&email)
        .bind(&hash)
        .bind(role.as_str())
        .bind(mandant_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.user_profile_id)
        .bind(&input.address)
        .bind(&mandant_access)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_to_conflict)?;

        info!("{} created user {} ({})", actor.username, user.username, user.role);
        Ok(user)
    }

    pub async fn update(&self, id: &str, patch: UserPatch, actor: &SessionUser) -> ServiceResult<User> {
        let existing = self.get(id, actor).await?;
        check_patch_permissions(actor, &patch)?;
        if patch.is_empty() {
            return Ok(existing);
        }

        let username = match patch.username {
            Some(u) if u.trim().is_empty() => return Err(ServiceError::field("username", "username must not be empty")),
            other => other.map(|u| u.trim().to_string()),
        };
        let email = normalize_email(patch.email)?;
        self.ensure_unique(
            username.as_deref().unwrap_or(&existing.username),
            email.as_deref(),
            Some(id),
        )
        .await?;

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        if let Some(username) = username {
            builder.push("username = ").push_bind(username).push(", ");
        }
        if let Some(email) = email {
            builder.push("email = ").push_bind(email).push(", ");
        }
        if let Some(role) = patch.role {
            builder.push("role = ").push_bind(role.as_str()).push(", ");
        }
        if let Some(mandant_id) = patch.mandant_id {
            builder.push("mandant_id = ").push_bind(mandant_id).push(", ");
        }
        if let Some(access) = patch.mandant_access {
            builder
                .push("mandant_access = ")
                .push_bind(serde_json::to_value(access).unwrap_or_else(|_| Value::Array(Vec::new())))
                .push(", ");
        }
        if let Some(first_name) = patch.first_name {
            builder.push("first_name = ").push_bind(first_name).push(", ");
        }
        if let Some(last_name) = patch.last_name {
            builder.push("last_name = ").push_bind(last_name).push(", ");
        }
        if let Some(profile_id) = patch.user_profile_id {
            builder.push("user_profile_id = ").push_bind(profile_id).push(", ");
        }
        if let Some(address) = patch.address {
            builder.push("address = ").push_bind(address).push(", ");
        }
        builder.push("updated_at = now() WHERE id = ").push_bind(id.to_string());
        builder.push(format!(" RETURNING {}", USER_COLUMNS));

        let user = builder
            .build_query_as::<User>()
            .fetch_one(&self.pool)
            .await
            .map_err(unique_to_conflict)?;
        info!("{} updated user {}", actor.username, user.username);
        Ok(user)
    }

    pub async fn delete(&self, id: &str, actor: &SessionUser) -> ServiceResult<()> {
        if actor.id == id {
            return Err(ServiceError::Forbidden("You cannot delete your own account".to_string()));
        }
        let target = self.load(id).await?;
        let allowed = match actor.role {
            Role::Superadmin => true,
            Role::Admin => {
                target.role() != Role::Superadmin
                    && target.mandant_id.is_some()
                    && target.mandant_id == actor.mandant_id
            }
            Role::User => false,
        };
        if !allowed {
            return Err(ServiceError::Forbidden("Users can only be deleted within your own mandant".to_string()));
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("{} deleted user {}", actor.username, target.username);
        Ok(())
    }

    /// Non-admins must prove the current password; admins reset directly
    pub async fn change_password(&self, id: &str, change: PasswordChange, actor: &SessionUser) -> ServiceResult<()> {
        let user = self.get(id, actor).await?;
        let new_password = change
            .new_password
            .ok_or_else(|| ServiceError::field("newPassword", "newPassword is required"))?;
        validate_new_password(&new_password).map_err(|m| ServiceError::field("newPassword", m))?;

        if !actor.is_admin() {
            let current = change
                .current_password
                .ok_or_else(|| ServiceError::field("currentPassword", "currentPassword is required"))?;
            let verified = match user.password.as_deref() {
                Some(hash) => verify_password(&current, hash).await?,
                None => false,
            };
            if !verified {
                return Err(ServiceError::field("currentPassword", "current password is incorrect"));
            }
        }

        let hash = hash_password(&new_password, config().security.bcrypt_cost).await?;
        sqlx::query("UPDATE users SET password = $1, updated_at = now() WHERE id = $2")
            .bind(&hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("{} changed the password of {}", actor.username, user.username);
        Ok(())
    }

    async fn ensure_unique(&self, username: &str, email: Option<&str>, except_id: Option<&str>) -> ServiceResult<()> {
        let taken: Option<(String, bool)> = sqlx::query_as(
            "SELECT id, lower(username) = lower($1) AS same_name FROM users \
             WHERE (lower(username) = lower($1) OR ($2::text IS NOT NULL AND lower(email) = lower($2))) \
             AND ($3::text IS NULL OR id <> $3) LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .bind(except_id)
        .fetch_optional(&self.pool)
        .await?;

        match taken {
            Some((_, true)) => Err(ServiceError::Conflict(format!("Username '{}' is already taken", username))),
            Some((_, false)) => Err(ServiceError::Conflict("Email address is already in use".to_string())),
            None => Ok(()),
        }
    }
}

fn unique_to_conflict(err: sqlx::Error) -> ServiceError {
    let err = DatabaseError::Sqlx(err);
    if err.is_unique_violation() {
        ServiceError::Conflict("Username or email already exists".to_string())
    } else {
        ServiceError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_user;
    use chrono::Utc;
    use serde_json::json;

    fn user(id: &str, mandant_id: Option<i32>) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: None,
            password: None,
            role: "user".into(),
            mandant_id,
            first_name: None,
            last_name: None,
            user_profile_id: None,
            address: None,
            mandant_access: json!([]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn users_manage_only_themselves() {
        let actor = session_user(Role::User, Some(1), vec![]);
        let mut me = user("other", Some(1));
        assert!(!can_manage(&actor, &me));
        me.id = actor.id.clone();
        assert!(can_manage(&actor, &me));
    }

    #[test]
    fn admins_manage_their_mandants() {
        let admin = session_user(Role::Admin, Some(1), vec![2]);
        assert!(can_manage(&admin, &user("a", Some(1))));
        assert!(can_manage(&admin, &user("b", Some(2))));
        assert!(!can_manage(&admin, &user("x", Some(99))));
        assert!(can_manage(&SessionUser::superadmin("root"), &user("c", None)));
    }

    #[test]
    fn admins_cannot_manage_superadmin_accounts() {
        let admin = session_user(Role::Admin, Some(1), vec![]);
        let mut root = user("root", Some(1));
        root.role = "superadmin".into();
        assert!(!can_manage(&admin, &root));
        assert!(can_manage(&SessionUser::superadmin("root"), &root));
    }

    #[test]
    fn mandant_grants_stay_inside_the_admin_scope() {
        let admin = session_user(Role::Admin, Some(1), vec![2]);
        assert!(check_mandant_grants(&admin, &[1, 2]).is_ok());
        assert!(matches!(check_mandant_grants(&admin, &[2, 99]), Err(ServiceError::Forbidden(_))));
        assert!(check_mandant_grants(&SessionUser::superadmin("root"), &[99]).is_ok());
    }

    #[test]
    fn admins_cannot_widen_access_through_a_patch() {
        let admin = session_user(Role::Admin, Some(1), vec![]);
        let widen = UserPatch { mandant_access: Some(vec![1, 42]), ..Default::default() };
        assert!(matches!(check_patch_permissions(&admin, &widen), Err(ServiceError::Forbidden(_))));

        let move_out = UserPatch { mandant_id: Some(42), ..Default::default() };
        assert!(check_patch_permissions(&admin, &move_out).is_err());

        let inside = UserPatch { mandant_access: Some(vec![1]), role: Some(Role::Admin), ..Default::default() };
        assert!(check_patch_permissions(&admin, &inside).is_ok());

        let user = session_user(Role::User, Some(1), vec![]);
        let own = UserPatch { mandant_access: Some(vec![1]), ..Default::default() };
        assert!(check_patch_permissions(&user, &own).is_err());
        let names = UserPatch { first_name: Some("Anna".into()), ..Default::default() };
        assert!(check_patch_permissions(&user, &names).is_ok());
    }

    #[test]
    fn superadmin_role_is_reserved() {
        let admin = session_user(Role::Admin, Some(1), vec![]);
        assert!(check_role_grant(&admin, Role::Admin).is_ok());
        assert!(matches!(check_role_grant(&admin, Role::Superadmin), Err(ServiceError::Forbidden(_))));
        assert!(check_role_grant(&SessionUser::superadmin("root"), Role::Superadmin).is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email(Some("  ".into())).unwrap(), None);
        assert_eq!(normalize_email(Some(" a@b.de ".into())).unwrap(), Some("a@b.de".into()));
        assert!(normalize_email(Some("nope".into())).is_err());
    }

    #[test]
    fn permission_fields_are_detected() {
        let patch: UserPatch = serde_json::from_value(json!({"firstName": "Eva"})).unwrap();
        assert!(!patch.touches_permissions());
        let patch: UserPatch = serde_json::from_value(json!({"mandantAccess": [1, 2]})).unwrap();
        assert!(patch.touches_permissions());
        assert!(UserPatch::default().is_empty());
    }
}

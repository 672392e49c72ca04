// auth/password.rs - bcrypt hashing off the async runtime

use once_cell::sync::Lazy;

use super::AuthError;

/// Minimum length accepted for new passwords
pub const MIN_PASSWORD_LENGTH: usize = 6;

// Compared against when the account does not exist, so both paths cost one bcrypt round
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| bcrypt::hash("netzwaechter-dummy-password", bcrypt::DEFAULT_COST).ok());

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// False for a wrong password and for a malformed stored hash
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(verified)
}

/// Verify against `hash`, or burn an equivalent bcrypt comparison when there is none
pub async fn verify_password_or_dummy(password: &str, hash: Option<&str>) -> Result<bool, AuthError> {
    match hash {
        Some(hash) => verify_password(password, hash).await,
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                verify_password(password, dummy).await?;
            }
            Ok(false)
        }
    }
}

pub fn validate_new_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_and_verifies() {
        let hash = hash_password("geheim123", 4).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("geheim123", &hash).await.unwrap());
        assert!(!verify_password("falsch", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", "not-a-bcrypt-hash").await.unwrap());
        assert!(!verify_password_or_dummy("x", None).await.unwrap());
    }

    #[test]
    fn enforces_minimum_length() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
    }
}

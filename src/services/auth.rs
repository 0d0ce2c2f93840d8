use crate::domain::ports::password_policy::PasswordPolicy;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Default strength rules:
/// - 10-72 characters long
/// - Contains uppercase letter
/// - Contains lowercase letter
/// - Contains digit
/// - Contains special character
#[derive(Clone, Copy, Debug, Default)]
pub struct ComplexityPolicy;

impl PasswordPolicy for ComplexityPolicy {
    fn check(&self, password: &str) -> Result<(), String> {
        validate_password_complexity(password)
    }
}

pub fn validate_password_complexity(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(10..=72).contains(&len) {
        return Err("Password must be 10-72 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(format!(
            "Password must contain at least one special character ({})",
            SPECIAL_CHARACTERS
        ));
    }

    Ok(())
}

/// Hash password using Argon2id with parameters:
/// - m_cost = 19456 KiB (19 MiB)
/// - t_cost = 2 iterations
/// - p_cost = 1 thread
///
/// CPU bound; call from `spawn_blocking` inside async code.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .build()?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify password against an Argon2 PHC string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_strong_password() {
        assert!(ComplexityPolicy.check("Str0ngP@ssword").is_ok());
    }

    #[test]
    fn test_policy_rejects_short_password() {
        assert_eq!(
            ComplexityPolicy.check("Sh0rt!"),
            Err("Password must be 10-72 characters long".to_string())
        );
    }

    #[test]
    fn test_policy_rejects_missing_classes() {
        assert!(validate_password_complexity("alllowercase1!")
            .unwrap_err()
            .contains("uppercase"));
        assert!(validate_password_complexity("ALLUPPERCASE1!")
            .unwrap_err()
            .contains("lowercase"));
        assert!(validate_password_complexity("NoDigitsHere!!")
            .unwrap_err()
            .contains("digit"));
        assert!(validate_password_complexity("NoSpecial12345")
            .unwrap_err()
            .contains("special"));
    }

    #[test]
    fn test_policy_rejects_overlong_password() {
        let password = format!("Aa1!{}", "x".repeat(80));
        assert!(validate_password_complexity(&password).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Str0ngP@ssword").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Str0ngP@ssword", &hash).unwrap());
        assert!(!verify_password("Wr0ngP@ssword", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("Str0ngP@ssword").unwrap();
        let second = hash_password("Str0ngP@ssword").unwrap();
        assert_ne!(first, second);
    }
}

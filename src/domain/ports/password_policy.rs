/// Strength rules for new passwords. The error string is shown to the user as-is.
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, password: &str) -> Result<(), String>;
}

/// Trim and lowercase an address for lookup.
///
/// Returns `None` for anything that is not a plausible `user@domain.tld`
/// address; the issuer treats those exactly like unknown accounts.
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();

    if !email_address::EmailAddress::is_valid(trimmed) {
        return None;
    }

    // Additional validation: require a TLD (dot after @)
    let (_, domain_part) = trimmed.rsplit_once('@')?;
    if !domain_part.contains('.') {
        return None;
    }

    Some(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert_eq!(
            normalize_email("test@example.com").as_deref(),
            Some("test@example.com")
        );
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            normalize_email("  Alice@Example.COM  ").as_deref(),
            Some("alice@example.com")
        );
    }

    #[test]
    fn test_invalid_email_no_at() {
        assert!(normalize_email("testexample.com").is_none());
    }

    #[test]
    fn test_invalid_email_no_domain() {
        assert!(normalize_email("test@").is_none());
    }

    #[test]
    fn test_invalid_email_no_tld() {
        assert!(normalize_email("test@localhost").is_none());
    }
}

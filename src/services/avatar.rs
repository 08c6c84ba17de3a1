use sha2::{Digest, Sha256};

/// Gravatar URL for an email address: 200px, PG rated, mystery-person fallback.
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?s=200&r=pg&d=mm", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_stable_under_case_and_whitespace() {
        assert_eq!(gravatar_url("A@X.com "), gravatar_url("a@x.com"));
    }

    #[test]
    fn uses_sha256_hex() {
        let url = gravatar_url("a@x.com");
        let hash = url
            .strip_prefix("https://www.gravatar.com/avatar/")
            .and_then(|rest| rest.split('?').next())
            .unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(url.ends_with("?s=200&r=pg&d=mm"));
    }
}

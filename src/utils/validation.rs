use once_cell::sync::Lazy;
use regex::Regex;

// Motif fixe local@domaine.tld
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("invalid email regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_addresses() {
        assert!(is_valid_email("jean@x.com"));
        assert!(is_valid_email("jean.dupont+crm@formation.example.org"));
        assert!(is_valid_email("J_D%42@sous.domaine.fr"));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("jean"));
        assert!(!is_valid_email("jean@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("jean@x"));
        assert!(!is_valid_email("jean@x.c"));
        assert!(!is_valid_email("jean dupont@x.com"));
    }
}

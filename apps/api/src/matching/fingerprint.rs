use sha2::{Digest, Sha256};

use crate::models::job::RawPosting;

/// Computes the identity fingerprint of a posting: SHA-256 over the
/// case-sensitive tuple (title, company, location) joined by `|`, hex-encoded.
///
/// Deliberately coarse: URL and description changes do not change identity,
/// and distinct postings sharing title/company/location collide. Sources
/// reuse and mutate URLs, so the URL is never part of identity.
pub fn fingerprint(posting: &RawPosting) -> String {
    let unique = format!(
        "{}|{}|{}",
        posting.title,
        posting.company,
        posting.location.as_deref().unwrap_or("")
    );
    let mut hasher = Sha256::new();
    hasher.update(unique.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str, company: &str, location: Option<&str>) -> RawPosting {
        RawPosting {
            title: title.to_string(),
            company: company.to_string(),
            location: location.map(|l| l.to_string()),
            url: Some("https://jobs.example/1".to_string()),
            description: Some("Build backend services".to_string()),
            salary: None,
            posted_date: None,
            source: "indeed".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let p = posting("Backend Engineer", "Acme", Some("Berlin"));
        assert_eq!(fingerprint(&p), fingerprint(&p));
    }

    #[test]
    fn test_fingerprint_ignores_url_and_description() {
        let a = posting("Backend Engineer", "Acme", Some("Berlin"));
        let mut b = a.clone();
        b.url = Some("https://jobs.example/other?ref=123".to_string());
        b.description = Some("Completely different text".to_string());
        b.salary = Some("€90k".to_string());
        b.posted_date = Some("2026-08-01".to_string());
        b.source = "stepstone".to_string();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_depends_on_identity_fields() {
        let base = posting("Backend Engineer", "Acme", Some("Berlin"));
        let other_title = posting("Frontend Engineer", "Acme", Some("Berlin"));
        let other_company = posting("Backend Engineer", "Initech", Some("Berlin"));
        let other_location = posting("Backend Engineer", "Acme", Some("Munich"));
        assert_ne!(fingerprint(&base), fingerprint(&other_title));
        assert_ne!(fingerprint(&base), fingerprint(&other_company));
        assert_ne!(fingerprint(&base), fingerprint(&other_location));
    }

    #[test]
    fn test_fingerprint_missing_location_is_empty_string() {
        let none = posting("Backend Engineer", "Acme", None);
        let empty = posting("Backend Engineer", "Acme", Some(""));
        assert_eq!(fingerprint(&none), fingerprint(&empty));
    }

    #[test]
    fn test_fingerprint_case_sensitive() {
        let lower = posting("backend engineer", "Acme", Some("Berlin"));
        let upper = posting("Backend Engineer", "Acme", Some("Berlin"));
        assert_ne!(fingerprint(&lower), fingerprint(&upper));
    }
}

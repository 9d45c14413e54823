use std::cmp::Ordering;

use sha2::{Digest, Sha256};

use crate::entities::submission::{FieldValue, NormalizedSubmission};

/// Hex SHA-256 over the `key:value` pairs of a normalized submission, sorted
/// by key and joined with `|`. Independent of insertion order.
pub fn generate_submission_hash(normalized: &NormalizedSubmission) -> String {
    let mut entries: Vec<(&String, &FieldValue)> = normalized.iter().collect();
    entries.sort_by(|(a, _), (b, _)| collate(a, b));

    let content = entries
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join("|");

    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Case-insensitive ordering with lower case ahead of upper case on ties,
/// the way a natural-language collation orders words.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(entries: &[(&str, &str)]) -> NormalizedSubmission {
        entries
            .iter()
            .map(|(k, v)| (*k, FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn identical_content_in_any_order_hashes_the_same() {
        let a = submission(&[("name", "John"), ("email", "john@example.com")]);
        let b = submission(&[("email", "john@example.com"), ("name", "John")]);

        assert_eq!(generate_submission_hash(&a), generate_submission_hash(&b));
    }

    #[test]
    fn different_content_hashes_differently() {
        let a = submission(&[("name", "John"), ("email", "john@example.com")]);
        let b = submission(&[("name", "Jane"), ("email", "jane@example.com")]);

        assert_ne!(generate_submission_hash(&a), generate_submission_hash(&b));
    }

    #[test]
    fn key_and_value_changes_both_matter() {
        let base = submission(&[("name", "John")]);
        let renamed = submission(&[("nickname", "John")]);

        assert_ne!(generate_submission_hash(&base), generate_submission_hash(&renamed));
    }

    #[test]
    fn digest_is_sha256_of_joined_pairs() {
        let s = submission(&[("name", "John"), ("email", "john@example.com")]);
        let expected = hex::encode(Sha256::digest(b"email:john@example.com|name:John"));

        let hash = generate_submission_hash(&s);
        assert_eq!(hash, expected);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn collation_ignores_case_then_prefers_lower() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("a", "A"), Ordering::Less);
        assert_eq!(collate("b", "b"), Ordering::Equal);
    }

    #[test]
    fn numbers_hash_like_their_text_rendering() {
        let numeric: NormalizedSubmission = [("budget", FieldValue::from(5000))].into_iter().collect();
        let expected = hex::encode(Sha256::digest(b"budget:5000"));

        assert_eq!(generate_submission_hash(&numeric), expected);
    }
}

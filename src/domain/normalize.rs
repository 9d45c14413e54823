use crate::entities::submission::{FieldValue, FormSubmission, NormalizedSubmission};

/// Lower-cases and trims every key, trims text values and drops nulls.
/// Other scalars pass through untouched.
pub fn normalize_submission(submission: &FormSubmission) -> NormalizedSubmission {
    let mut normalized = NormalizedSubmission::default();

    for (key, value) in submission.iter() {
        let normalized_key = key.to_lowercase().trim().to_string();

        match value {
            FieldValue::Null => continue,
            FieldValue::Text(text) => {
                normalized.insert(normalized_key, FieldValue::Text(text.trim().to_string()))
            }
            other => normalized.insert(normalized_key, other.clone()),
        }
    }

    normalized
}

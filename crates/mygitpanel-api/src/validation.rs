//! Repo full-name validation: exactly one `/`, each side non-empty and
//! `[A-Za-z0-9._-]` only. Hand-rolled rather than a `regex` dependency —
//! the check is simple enough that pulling in `regex` here (it's already
//! used for suggestion-block extraction elsewhere) would just duplicate
//! intent.

use crate::error::ApiError;

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub fn validate_full_name(full_name: &str) -> Result<(), ApiError> {
    let mut parts = full_name.splitn(3, '/');
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ApiError::bad_request(format!(
            "invalid repository name: {full_name}"
        )));
    };

    if is_valid_segment(owner) && is_valid_segment(repo) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "invalid repository name: {full_name}"
        )))
    }
}

//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Validates that a selection does not name the same row twice.
///
/// # Examples
///
/// ```ignore
/// validate_unique_ids(&[1, 2, 3]) // Ok
/// validate_unique_ids(&[1, 2, 1]) // Err - 1 selected twice
/// ```
pub fn validate_unique_ids(ids: &[i64]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(**id)) {
        let mut err = ValidationError::new("duplicate_id");
        err.message = Some(format!("{duplicate} is selected more than once").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unique_ids_valid() {
        assert!(validate_unique_ids(&[1, 2, 3]).is_ok());
        assert!(validate_unique_ids(&[]).is_ok());
    }

    #[test]
    fn test_validate_unique_ids_duplicate() {
        let err = validate_unique_ids(&[4, 7, 4]).unwrap_err();
        assert_eq!(err.code, "duplicate_id");
        assert!(err.message.unwrap().contains('4'));
    }
}

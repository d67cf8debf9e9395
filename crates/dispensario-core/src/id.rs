use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("Invalid ID: {0}")]
    Invalid(String),
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// IDs come from us (uuid v4) or from migrated rows; accept a conservative
/// charset so path segments stay unambiguous.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() || id.len() > 64 {
        return Err(IdError::Invalid(id.to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(IdError::Invalid(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_valid() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(validate_id(&a).is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(validate_id("").is_err());
        assert!(validate_id(&"x".repeat(65)).is_err());
        assert!(validate_id(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_path_breaking_characters() {
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a b").is_err());
        assert!(validate_id("p-1_x.2").is_ok());
    }
}

//! Custom validators used with `#[validate(custom(...))]`.

use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "Value cannot be empty"))
    } else {
        Ok(())
    }
}

/// Anonymous usernames: 3 to 40 characters of lowercase letters, digits,
/// `-` or `_`.
pub fn validate_anonymous_username(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(3..=40).contains(&len) {
        return Err(error(
            "username_length",
            "Username must be between 3 and 40 characters",
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(error(
            "username_charset",
            "Username may only contain lowercase letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// Mood check-ins are on a 1 to 5 scale.
pub fn validate_mood_value(value: i32) -> Result<(), ValidationError> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(error("mood_range", "Mood must be between 1 and 5"))
    }
}

/// Struggle tags used by matching: non-empty, at most 40 characters.
pub fn validate_struggle_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > 10 {
        return Err(error("struggles_count", "At most 10 struggles may be listed"));
    }
    if tags
        .iter()
        .any(|t| t.trim().is_empty() || t.chars().count() > 40)
    {
        return Err(error(
            "struggles_format",
            "Each struggle must be between 1 and 40 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("hello").is_ok());
        assert!(validate_not_blank("  hi  ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \n\t ").is_err());
    }

    #[test]
    fn test_anonymous_username() {
        assert!(validate_anonymous_username("zippy-panda-42").is_ok());
        assert!(validate_anonymous_username("a_b").is_ok());
        assert!(validate_anonymous_username("ab").is_err());
        assert!(validate_anonymous_username("Zippy-Panda").is_err());
        assert!(validate_anonymous_username("has space").is_err());
        assert!(validate_anonymous_username(&"x".repeat(41)).is_err());
    }

    #[test]
    fn test_mood_value_bounds() {
        assert!(validate_mood_value(1).is_ok());
        assert!(validate_mood_value(5).is_ok());
        assert!(validate_mood_value(0).is_err());
        assert!(validate_mood_value(6).is_err());
    }

    #[test]
    fn test_struggle_tags() {
        assert!(validate_struggle_tags(&["anxiety".into(), "sleep".into()]).is_ok());
        assert!(validate_struggle_tags(&[]).is_ok());
        assert!(validate_struggle_tags(&["  ".into()]).is_err());
        let many: Vec<String> = (0..11).map(|i| format!("tag{i}")).collect();
        assert!(validate_struggle_tags(&many).is_err());
    }

    #[test]
    fn test_error_carries_message() {
        let err = validate_mood_value(9).unwrap_err();
        assert_eq!(err.code, "mood_range");
        assert!(err.message.unwrap().contains("1 and 5"));
    }
}

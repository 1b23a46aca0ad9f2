use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

/// Field-level checks a request DTO runs after it has been decoded.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn require_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid email: {email}")))
    }
}

pub fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

pub fn require_optional_text(field: &str, value: Option<&str>) -> Result<(), AppError> {
    value.map_or(Ok(()), |v| require_text(field, v))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Text(String),
    Number(u64),
}

impl RawReference {
    fn into_string(self) -> String {
        match self {
            RawReference::Text(s) => s.trim().to_string(),
            RawReference::Number(n) => n.to_string(),
        }
    }
}

/// Id of a record owned by another service. Accepted as a string or a
/// non-negative integer and kept as an opaque string; existence is not checked.
pub fn reference<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    RawReference::deserialize(de).map(RawReference::into_string)
}

pub fn optional_reference<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawReference>::deserialize(de)?.map(RawReference::into_string))
}

/// Decode a payload into `T` without further checks.
pub fn payload<T: DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|e| AppError::Validation(e.to_string()))
}

/// Decode a payload into `T` and run its field checks.
pub fn validated<T: DeserializeOwned + Validate>(data: Value) -> Result<T, AppError> {
    let dto: T = payload(data)?;
    dto.validate()?;
    Ok(dto)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("john@example"));
        assert!(!is_valid_email("john example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(normalize_email("  John@Example.COM "), "john@example.com");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("name", "  ").is_err());
        assert!(require_text("name", "Civic").is_ok());
        assert!(require_optional_text("name", None).is_ok());
        assert!(require_optional_text("name", Some("")).is_err());
    }

    #[test]
    fn references_accept_strings_and_integers() {
        #[derive(Deserialize)]
        struct Reference {
            #[serde(deserialize_with = "reference")]
            user_id: String,
            #[serde(default, deserialize_with = "optional_reference")]
            group_id: Option<String>,
        }

        let p: Reference = serde_json::from_value(serde_json::json!({"user_id": 1})).unwrap();
        assert_eq!(p.user_id, "1");
        assert_eq!(p.group_id, None);

        let p: Reference =
            serde_json::from_value(serde_json::json!({"user_id": " u-7 ", "group_id": 3})).unwrap();
        assert_eq!(p.user_id, "u-7");
        assert_eq!(p.group_id.as_deref(), Some("3"));

        assert!(serde_json::from_value::<Reference>(serde_json::json!({"user_id": true})).is_err());
    }

    #[test]
    fn payload_shape_errors_are_validation_errors() {
        let err = payload::<u32>(serde_json::json!("nope")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;

const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_TITLE_LEN: usize = 200;
const MAX_SHORT_FIELD_LEN: usize = 100;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("Invalid regex")
    })
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,12})(?:\.(\d{1,2}))?$").expect("Invalid regex"))
}

/// Parses a path id. Non-numeric, zero and negative ids are a 422.
pub fn parse_id(raw: &str, resource: &str) -> Result<i32, ApiError> {
    let id: i64 = raw.trim().parse().map_err(|_| {
        ApiError::unprocessable(format!("Invalid {resource} ID: {raw:?} is not an integer"))
    })?;

    if id <= 0 {
        return Err(ApiError::unprocessable(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }

    i32::try_from(id)
        .map_err(|_| ApiError::unprocessable(format!("Invalid {resource} ID: {id} is too large")))
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if trimmed.len() > MAX_USERNAME_LEN {
        return Err(ApiError::validation(format!(
            "Username must be {MAX_USERNAME_LEN} characters or less"
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, dots, hyphens, and underscores",
        ));
    }

    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if !email_regex().is_match(trimmed) {
        return Err(ApiError::validation(format!("Invalid email address: {trimmed}")));
    }
    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be {MAX_PASSWORD_LEN} characters or less"
        )));
    }
    Ok(password)
}

pub fn validate_title(title: &str) -> Result<String, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "Title must be {MAX_TITLE_LEN} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

/// Short free-text fields such as `distance_to_beach` and `rental_type`.
pub fn validate_text_field(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_SHORT_FIELD_LEN {
        return Err(ApiError::validation(format!(
            "{field} must be {MAX_SHORT_FIELD_LEN} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_non_negative(field: &str, value: i32) -> Result<i32, ApiError> {
    if value < 0 {
        return Err(ApiError::validation(format!(
            "{field} must be zero or greater (got {value})"
        )));
    }
    Ok(value)
}

/// Accepts a non-negative decimal with at most two fraction digits and
/// normalizes it to exactly two ("1500" -> "1500.00").
pub fn validate_price(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    let caps = price_regex().captures(trimmed).ok_or_else(|| {
        ApiError::validation(format!(
            "Invalid price: {trimmed:?}. Use a non-negative amount such as 1500.00"
        ))
    })?;

    let whole = caps.get(1).map_or("0", |m| m.as_str());
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let cents = caps.get(2).map_or("", |m| m.as_str());

    Ok(format!("{whole}.{cents:0<2}"))
}

/// Form scalars. A value that does not parse is a schema error (422), not a
/// rule violation.
pub fn parse_bool(field: &str, raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ApiError::unprocessable(format!(
            "{field} must be a boolean (got {other:?})"
        ))),
    }
}

pub fn parse_int(field: &str, raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::unprocessable(format!("{field} must be an integer (got {raw:?})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1", "Listing").unwrap(), 1);
        assert_eq!(parse_id("12345", "Listing").unwrap(), 12345);
        assert!(matches!(
            parse_id("0", "Listing"),
            Err(ApiError::Unprocessable(_))
        ));
        assert!(matches!(
            parse_id("-1", "Listing"),
            Err(ApiError::Unprocessable(_))
        ));
        assert!(matches!(
            parse_id("abc", "Listing"),
            Err(ApiError::Unprocessable(_))
        ));
        assert!(parse_id("99999999999", "Listing").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" alice ").unwrap(), "alice");
        assert!(validate_username("a.b-c_d").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test1@test.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert_eq!(validate_price("500.00").unwrap(), "500.00");
        assert_eq!(validate_price("1500").unwrap(), "1500.00");
        assert_eq!(validate_price("99.5").unwrap(), "99.50");
        assert_eq!(validate_price("007.25").unwrap(), "7.25");
        assert_eq!(validate_price("0").unwrap(), "0.00");
        assert!(validate_price("-1").is_err());
        assert!(validate_price("12.345").is_err());
        assert!(validate_price("abc").is_err());
        assert!(validate_price("").is_err());
    }

    #[test]
    fn test_text_fields() {
        assert_eq!(validate_title("  Beach house ").unwrap(), "Beach house");
        assert!(validate_title("   ").is_err());
        assert!(validate_text_field("rental_type", "").is_err());
        assert!(validate_non_negative("rooms", 0).is_ok());
        assert!(validate_non_negative("rooms", -2).is_err());
    }

    #[test]
    fn test_parse_scalars() {
        assert!(parse_bool("furnished", "true").unwrap());
        assert!(!parse_bool("furnished", "False").unwrap());
        assert!(matches!(
            parse_bool("furnished", "maybe"),
            Err(ApiError::Unprocessable(_))
        ));
        assert_eq!(parse_int("rooms", " 3 ").unwrap(), 3);
        assert!(parse_int("rooms", "three").is_err());
    }
}

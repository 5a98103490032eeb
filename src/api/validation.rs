use std::sync::LazyLock;

use regex::Regex;

use super::ApiError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex must compile")
});

/// 1 to 50 characters, no whitespace and no angle brackets. Everything else
/// is allowed on purpose; display names are the place for decoration.
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let len = username.chars().count();
    if !(1..=50).contains(&len) {
        return Err(ApiError::validation("Username must be 1-50 characters"));
    }

    if username
        .chars()
        .any(|c| c.is_whitespace() || c == '<' || c == '>')
    {
        return Err(ApiError::validation(
            "Username cannot contain spaces or < > characters",
        ));
    }

    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }
    Ok(password)
}

pub fn validate_page(page: u64, limit: u64) -> Result<(u64, u64), ApiError> {
    const MAX_LIMIT: u64 = 100;

    if page == 0 {
        return Err(ApiError::validation("Page must be at least 1"));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    Ok((page, limit))
}

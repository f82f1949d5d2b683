//! # Business Rules
//!
//! Pure functions shared by services and adapters: field limits,
//! validation, pagination arithmetic, and the reputation formula.

use crate::errors::{DomainError, DomainResult};

pub const POSTS_PER_PAGE: u32 = 20;
pub const RECENT_POSTS_ON_PROFILE: u32 = 10;

pub const POST_TITLE_MAX_CHARS: usize = 200;
pub const POST_EXCERPT_CHARS: usize = 100;
pub const REPLY_EXCERPT_CHARS: usize = 50;

pub const THEME_NAME_MAX_CHARS: usize = 50;
pub const THEME_IDENTIFIER_MAX_CHARS: usize = 20;
pub const THEME_VARIABLE_NAME_MAX_CHARS: usize = 50;
pub const THEME_VARIABLE_VALUE_MAX_CHARS: usize = 100;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PERSON_NAME_MAX_CHARS: usize = 30;
pub const SIGNATURE_MAX_CHARS: usize = 100;

pub const REPUTATION_PER_POST: i64 = 2;
pub const REPUTATION_PER_REPLY: i64 = 1;
pub const REPUTATION_PER_ESSENCE: i64 = 10;

/// Reputation is a pure function of three counts.
pub fn reputation(post_count: i64, reply_count: i64, essence_count: i64) -> i64 {
    post_count * REPUTATION_PER_POST
        + reply_count * REPUTATION_PER_REPLY
        + essence_count * REPUTATION_PER_ESSENCE
}

/// Number of pages for `total` items; an empty result still has one page.
pub fn page_count(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 1;
    }
    let per_page = i64::from(per_page);
    u32::try_from((total + per_page - 1) / per_page).unwrap_or(u32::MAX)
}

/// Out-of-range page numbers snap to the nearest valid page.
pub fn clamp_page(requested: u32, total: i64, per_page: u32) -> u32 {
    requested.clamp(1, page_count(total, per_page))
}

/// Truncates to `max_chars` characters, appending "..." when shortened.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn validate_post_fields(title: &str, content: &str) -> DomainResult<()> {
    if title.is_empty() || content.is_empty() {
        return Err(DomainError::Validation("title and content must not be empty".into()));
    }
    if title.chars().count() > POST_TITLE_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "title must be at most {} characters",
            POST_TITLE_MAX_CHARS
        )));
    }
    Ok(())
}

pub fn validate_reply_content(content: &str) -> DomainResult<()> {
    if content.is_empty() {
        return Err(DomainError::Validation("reply content must not be empty".into()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(DomainError::Validation(format!(
            "username must be {}-{} characters",
            USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
        )));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
    if !username.chars().all(allowed) {
        return Err(DomainError::Validation(
            "username may only contain letters, digits and _ . @ + -".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> DomainResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::Validation("enter a valid email address".into()));
    }
    Ok(())
}

pub fn validate_person_name(field: &str, value: &str) -> DomainResult<()> {
    if value.chars().count() > PERSON_NAME_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "{} must be at most {} characters",
            field, PERSON_NAME_MAX_CHARS
        )));
    }
    Ok(())
}

pub fn validate_signature(signature: &str) -> DomainResult<()> {
    if signature.chars().count() > SIGNATURE_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "signature must be at most {} characters",
            SIGNATURE_MAX_CHARS
        )));
    }
    Ok(())
}

pub fn validate_theme_fields(name: &str, identifier: &str) -> DomainResult<()> {
    if name.is_empty() || identifier.is_empty() {
        return Err(DomainError::Validation("theme name and identifier are required".into()));
    }
    if name.chars().count() > THEME_NAME_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "theme name must be at most {} characters",
            THEME_NAME_MAX_CHARS
        )));
    }
    if identifier.chars().count() > THEME_IDENTIFIER_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "theme identifier must be at most {} characters",
            THEME_IDENTIFIER_MAX_CHARS
        )));
    }
    Ok(())
}

pub fn validate_theme_variables(variables: &[(String, String)]) -> DomainResult<()> {
    let mut seen = std::collections::HashSet::new();
    for (name, value) in variables {
        if name.is_empty() || name.chars().count() > THEME_VARIABLE_NAME_MAX_CHARS {
            return Err(DomainError::Validation(format!(
                "variable names must be 1-{} characters",
                THEME_VARIABLE_NAME_MAX_CHARS
            )));
        }
        if value.chars().count() > THEME_VARIABLE_VALUE_MAX_CHARS {
            return Err(DomainError::Validation(format!(
                "value of '{}' must be at most {} characters",
                name, THEME_VARIABLE_VALUE_MAX_CHARS
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(DomainError::Validation(format!("variable '{}' is defined twice", name)));
        }
    }
    Ok(())
}

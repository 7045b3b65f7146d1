//! Input validation for leads, notes and profiles.
//!
//! Deliberately minimal:
//! - Names and emails are trimmed and must be non-empty
//! - Emails need a single `@` with text on both sides
//! - A blank company counts as no company
//! - Notes must contain something other than whitespace
//! - Every field is capped in length

use leads_common::{CreateLeadInput, Error, Result, UserProfile};

/// Maximum length of a name, email or company, in characters.
pub const MAX_FIELD_LENGTH: usize = 256;

/// Maximum length of a single note, in characters.
pub const MAX_NOTE_LENGTH: usize = 10_000;

/// Normalize and check lead creation input.
pub fn validate_lead_input(input: CreateLeadInput) -> Result<CreateLeadInput> {
    let (name, email, company) = validate_contact(input.name, input.email, input.company)?;
    Ok(CreateLeadInput {
        name,
        email,
        company,
    })
}

/// Normalize and check a profile before it is saved.
pub fn validate_profile(profile: UserProfile) -> Result<UserProfile> {
    let (name, email, company) =
        validate_contact(profile.name, profile.email, profile.company)?;
    Ok(UserProfile {
        name,
        email,
        company,
    })
}

/// Check a note. The text is kept as written.
pub fn validate_note(note: &str) -> Result<()> {
    if note.trim().is_empty() {
        return Err(Error::Validation("Note must not be empty".to_string()));
    }
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(Error::Validation(format!(
            "Note exceeds {} characters",
            MAX_NOTE_LENGTH
        )));
    }
    Ok(())
}

fn validate_contact(
    name: String,
    email: String,
    company: Option<String>,
) -> Result<(String, String, Option<String>)> {
    let name = required("name", &name)?;
    let email = required("email", &email)?;
    if !is_plausible_email(&email) {
        return Err(Error::Validation(format!("Invalid email address: {}", email)));
    }

    let company = match company {
        Some(company) if !company.trim().is_empty() => Some(bounded("company", company.trim())?),
        _ => None,
    };

    Ok((name, email, company))
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    bounded(field, value)
}

fn bounded(field: &str, value: &str) -> Result<String> {
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(Error::Validation(format!(
            "{} exceeds {} characters",
            field, MAX_FIELD_LENGTH
        )));
    }
    Ok(value.to_string())
}

/// `local@domain`, exactly one `@`, no whitespace
fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

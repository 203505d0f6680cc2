use regex::Regex;

use crate::db::Role;
use crate::error::AppError;

/// The common registration fields; seller-only fields stay `None` for buyers.
#[derive(Debug)]
pub struct RegistrationData<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone_number: Option<&'a str>,
    pub country: Option<&'a str>,
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .map_or(false, |re| re.is_match(email))
}

/// Structural validation of a registration payload. Pure, no I/O.
pub fn validate_registration(data: &RegistrationData<'_>, role: Role) -> Result<(), AppError> {
    let missing_common = data.name.trim().is_empty()
        || data.email.trim().is_empty()
        || data.password.trim().is_empty();

    let missing_seller = role == Role::Seller
        && (data.phone_number.map_or(true, |p| p.trim().is_empty())
            || data.country.map_or(true, |c| c.trim().is_empty()));

    if missing_common || missing_seller {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    if !is_valid_email(data.email.trim()) {
        return Err(AppError::Validation("Invalid email".to_string()));
    }

    Ok(())
}

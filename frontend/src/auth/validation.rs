//! Local input rules checked before any request leaves the device.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NewStudent;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_YEAR: u32 = 1;
pub const MAX_YEAR: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Vă rugăm completați email și parolă")]
    MissingCredentials,
    #[error("Vă rugăm completați toate câmpurile")]
    MissingFields,
    #[error("Vă rugăm să introduceți un email valid")]
    InvalidEmail,
    #[error("Parola trebuie să aibă cel puțin 6 caractere")]
    PasswordTooShort,
    #[error("Anul de studiu trebuie să fie între 1 și 6")]
    InvalidYear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterData {
    pub first_name: String,
    pub last_name: String,
    pub group: String,
    pub year: String,
    pub specialization: String,
    pub email: String,
    pub password: String,
}

/// `^[^\s@]+@[^\s@]+\.[^\s@]+$`: one `@`, no whitespace, and a dot in the
/// domain with at least one character on each side.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if has_inner_dot {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Digits only, then an integer in `[1, 6]`.
pub fn parse_year(year: &str) -> Result<i64, ValidationError> {
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidYear);
    }
    match year.parse::<u32>() {
        Ok(value) if (MIN_YEAR..=MAX_YEAR).contains(&value) => Ok(i64::from(value)),
        _ => Err(ValidationError::InvalidYear),
    }
}

pub fn validate_login(credentials: &LoginCredentials) -> Result<(), ValidationError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// Checks every registration rule and returns the profile to create.
pub fn validate_registration(data: &RegisterData) -> Result<NewStudent, ValidationError> {
    let required = [
        &data.first_name,
        &data.last_name,
        &data.group,
        &data.year,
        &data.specialization,
        &data.email,
    ];
    if required.iter().any(|field| field.trim().is_empty()) || data.password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    validate_email(&data.email)?;
    validate_password(&data.password)?;
    let year = parse_year(&data.year)?;

    Ok(NewStudent {
        last_name: data.last_name.trim().to_string(),
        first_name: data.first_name.trim().to_string(),
        group: data.group.trim().to_string(),
        year,
        specialization: data.specialization.trim().to_string(),
        email: data.email.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterData {
        RegisterData {
            first_name: "Ana".into(),
            last_name: "Popescu".into(),
            group: "1731A".into(),
            year: "2".into(),
            specialization: "Informatica".into(),
            email: "ana@student.ro".into(),
            password: "secret1".into(),
        }
    }

    #[test]
    fn email_pattern_accepts_plain_addresses() {
        for email in ["a@b.co", "ana.pop@student.upb.ro", "x+y@d.io", "a@b.c.d"] {
            assert!(validate_email(email).is_ok(), "{email}");
        }
    }

    #[test]
    fn email_pattern_rejects_malformed_addresses() {
        for email in [
            "",
            "plain",
            "@b.com",
            "a@.com",
            "a@com",
            "a@b.",
            "a@@b.com",
            "a@b@c.com",
            "a b@c.com",
            "a@b .com",
            " a@b.com",
        ] {
            assert_eq!(
                validate_email(email),
                Err(ValidationError::InvalidEmail),
                "{email}"
            );
        }
    }

    #[test]
    fn password_needs_six_characters() {
        assert_eq!(
            validate_password("12345"),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn year_must_be_digits_in_range() {
        assert_eq!(parse_year("1"), Ok(1));
        assert_eq!(parse_year("6"), Ok(6));
        assert_eq!(parse_year("06"), Ok(6));
        for year in ["0", "7", "-1", "2.5", "doi", " 2", "", "99999999999999999999"] {
            assert_eq!(parse_year(year), Err(ValidationError::InvalidYear), "{year}");
        }
    }

    #[test]
    fn registration_requires_every_field() {
        let mut data = registration();
        data.group = "   ".into();
        assert_eq!(
            validate_registration(&data),
            Err(ValidationError::MissingFields)
        );
    }

    #[test]
    fn registration_builds_profile() {
        let student = validate_registration(&registration()).unwrap();
        assert_eq!(student.year, 2);
        assert_eq!(student.email, "ana@student.ro");
    }

    #[test]
    fn login_requires_both_credentials() {
        let credentials = LoginCredentials {
            email: "ana@student.ro".into(),
            password: String::new(),
        };
        assert_eq!(
            validate_login(&credentials),
            Err(ValidationError::MissingCredentials)
        );
    }
}

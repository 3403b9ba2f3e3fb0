use regex::Regex;

use crate::errors::ServiceError;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Wraps user input until it has been validated
#[derive(Debug)]
pub struct Validator<T>(T);

pub trait Validate<T> {
    fn validate(&self) -> Result<(), ServiceError>;
}

impl<T> Validator<T> {
    pub fn new(i: T) -> Validator<T> {
        Validator::<T>(i)
    }
}

impl<T> Validator<T>
where
    T: Validate<T>,
{
    /// returns the inner value when it passes validation
    pub fn validate(self) -> Result<T, ServiceError> {
        self.0.validate()?;
        Ok(self.0)
    }
}

/// a non blank name of at most `max` characters
pub fn name(field: &str, value: &str, max: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        bad_request!(format!("{} is too short", field));
    }

    if value.trim().chars().count() > max {
        bad_request!(format!("{} is too long, maximum {} characters", field, max));
    }

    Ok(())
}

/// a finite amount of money, zero included
pub fn amount(field: &str, value: f64) -> Result<(), ServiceError> {
    if !value.is_finite() {
        bad_request!(format!("{} is not a number", field));
    }

    if value < 0.0 {
        bad_request!(format!("{} cannot be negative", field));
    }

    Ok(())
}

/// empty emails are allowed, players created by hand usually have none
pub fn email(value: &str) -> Result<(), ServiceError> {
    if !value.is_empty() && !EMAIL.is_match(value) {
        bad_request!("the email address is not valid");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Validate<bool> for bool {
        fn validate(&self) -> Result<(), ServiceError> {
            if *self {
                return Ok(());
            }
            Err(ServiceError::BadRequest("invalid input".to_string()))
        }
    }

    #[test]
    fn invalid_value() {
        let invalid = Validator::new(false);

        assert!(invalid.validate().is_err());
    }

    #[test]
    fn valid_value() {
        let valid = Validator::new(true);

        assert!(valid.validate().is_ok());
    }

    #[test]
    fn blank_names() {
        assert!(name("name", "   ", 10).is_err());
        assert!(name("name", "abcdefghijk", 10).is_err());
        assert!(name("name", "Sports Hall", 40).is_ok());
    }

    #[test]
    fn amounts() {
        assert!(amount("cost", -1.0).is_err());
        assert!(amount("cost", f64::NAN).is_err());
        assert!(amount("cost", f64::INFINITY).is_err());
        assert!(amount("cost", 0.0).is_ok());
        assert!(amount("cost", 12.5).is_ok());
    }

    #[test]
    fn emails() {
        assert!(email("").is_ok());
        assert!(email("john@example.com").is_ok());
        assert!(email("john@").is_err());
        assert!(email("john doe@example.com").is_err());
    }
}

//! Login form model and client-side validation.

use crate::error::{Result, ShopdeskError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Credentials plus the tenant selected on the login screen.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub business: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .field("business", &self.business)
            .finish()
    }
}

impl LoginForm {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        business: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            business: business.into(),
        }
    }

    /// Checks the form before anything is sent. Reports the first failing field.
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ShopdeskError::validation("email", "Email is required"));
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err(ShopdeskError::validation("email", "Invalid email address"));
        }
        if self.password.is_empty() {
            return Err(ShopdeskError::validation("password", "Password is required"));
        }
        if self.business.trim().is_empty() {
            return Err(ShopdeskError::validation("business", "Please select a business"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_form() {
        assert!(LoginForm::new("a@b.com", "x", "penhouse").validate().is_ok());
    }

    #[test]
    fn test_reports_failing_field() {
        let cases = [
            (LoginForm::new("", "x", "penhouse"), "email"),
            (LoginForm::new("not-an-email", "x", "penhouse"), "email"),
            (LoginForm::new("a@b.com", "", "penhouse"), "password"),
            (LoginForm::new("a@b.com", "x", " "), "business"),
        ];
        for (form, expected) in cases {
            match form.validate() {
                Err(ShopdeskError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error on {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let form = LoginForm::new("a@b.com", "hunter2", "penhouse");
        assert!(!format!("{form:?}").contains("hunter2"));
    }
}

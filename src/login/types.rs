use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Why a password change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChangeProblem {
    WrongOldPassword,
    TooShort,
    Mismatch,
}

impl PasswordChangeProblem {
    pub fn message(&self) -> &'static str {
        match self {
            PasswordChangeProblem::WrongOldPassword => "Current password is incorrect",
            PasswordChangeProblem::TooShort => "New password must be at least 6 characters",
            PasswordChangeProblem::Mismatch => "New passwords do not match",
        }
    }
}

impl ChangePasswordForm {
    /// Checks that do not need the stored hash: length, then confirmation.
    pub fn validate_new_password(&self) -> Result<(), PasswordChangeProblem> {
        if self.new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(PasswordChangeProblem::TooShort);
        }
        if self.new_password != self.confirm_password {
            return Err(PasswordChangeProblem::Mismatch);
        }
        Ok(())
    }
}

//! User accounts.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 255;
/// Minimum allowed length for a password.
pub const PASSWORD_MIN: usize = 6;

/// Validation errors for user fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUsername,
    UsernameTooLong { max: usize },
    UsernameInvalidCharacters,
    InvalidEmail,
    PasswordTooShort { min: usize },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameInvalidCharacters => write!(
                f,
                "username may only contain letters, numbers, dots, hyphens or underscores",
            ),
            Self::InvalidEmail => write!(f, "email address is not valid"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

impl UserValidationError {
    /// Payload field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername | Self::UsernameTooLong { .. } | Self::UsernameInvalidCharacters => {
                "username"
            }
            Self::InvalidEmail => "email",
            Self::PasswordTooShort { .. } => "password",
        }
    }

    /// Machine readable code for adapters.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "empty_username",
            Self::UsernameTooLong { .. } => "username_too_long",
            Self::UsernameInvalidCharacters => "invalid_username",
            Self::InvalidEmail => "invalid_email",
            Self::PasswordTooShort { .. } => "password_too_short",
        }
    }
}

impl From<UserValidationError> for crate::domain::Error {
    fn from(value: UserValidationError) -> Self {
        Self::invalid_field(value.field(), value.code(), value.to_string())
    }
}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        Regex::new(r"^[\w.-]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// Login name: word characters, dots and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    ///
    /// # Examples
    /// ```
    /// use tracker_backend::domain::Username;
    ///
    /// assert!(Username::new("ada.lovelace").is_ok());
    /// assert!(Username::new("ada lovelace").is_err());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if raw.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if !username_regex().is_match(&raw) {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(raw))
    }

    /// Borrow the username.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address with a minimal structural check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    ///
    /// Surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = raw.as_ref().trim();
        let mut parts = raw.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(UserValidationError::InvalidEmail);
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.chars().any(char::is_whitespace);
        if local.is_empty() || local.chars().any(char::is_whitespace) || !domain_ok {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Case-insensitive comparison used for uniqueness checks.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Check a candidate password against the length policy.
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(UserValidationError::PasswordTooShort { min: PASSWORD_MIN });
    }
    Ok(())
}

/// Account data for a user that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub full_name: String,
    pub password_hash: Option<String>,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Registered user account.
///
/// ## Invariants
/// - `username` is unique across accounts.
/// - `email` is unique across accounts, ignoring ASCII case.
/// - Cancelled accounts have `is_active == false` and no password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub full_name: String,
    pub bio: String,
    pub lang: String,
    pub color: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub email_token: Option<String>,
    pub new_email: Option<Email>,
    pub recovery_token: Option<String>,
}

impl User {
    /// Build a stored user from its insert payload.
    pub fn from_new(id: UserId, new_user: NewUser) -> Self {
        let NewUser {
            username,
            email,
            full_name,
            password_hash,
            is_superuser,
            date_joined,
        } = new_user;
        Self {
            id,
            username,
            email,
            full_name,
            bio: String::new(),
            lang: String::new(),
            color: String::new(),
            password_hash,
            is_active: true,
            is_superuser,
            date_joined,
            email_token: None,
            new_email: None,
            recovery_token: None,
        }
    }

    /// Name shown to other users: the full name when set, else the username.
    ///
    /// # Examples
    /// ```
    /// # use chrono::Utc;
    /// use tracker_backend::domain::{Email, NewUser, User, UserId, Username};
    ///
    /// let user = User::from_new(UserId::new(1), NewUser {
    ///     username: Username::new("ada").expect("username"),
    ///     email: Email::new("ada@example.com").expect("email"),
    ///     full_name: String::new(),
    ///     password_hash: None,
    ///     is_superuser: false,
    ///     date_joined: Utc::now(),
    /// });
    /// assert_eq!(user.display_name(), "ada");
    /// ```
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            self.username.as_str()
        } else {
            self.full_name.as_str()
        }
    }

    /// Anonymise the account in place.
    ///
    /// `username` must already be unique (see
    /// [`crate::domain::UsersService::cancel`]).
    pub fn cancel(&mut self, username: Username) {
        let email = format!("{username}@deleted.invalid");
        self.email = Email(email);
        self.username = username;
        self.full_name = "Deleted user".to_owned();
        self.bio.clear();
        self.lang.clear();
        self.color.clear();
        self.password_hash = None;
        self.is_active = false;
        self.email_token = None;
        self.new_email = None;
        self.recovery_token = None;
    }
}

#[cfg(test)]
mod tests;

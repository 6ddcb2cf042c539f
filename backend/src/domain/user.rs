//! User data model owned by the users service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 64;

/// Validation errors raised while building user values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    NonPositiveId { id: i32 },
    EmptyUsername,
    UsernameTooLong { max: usize },
    EmptyEmail,
    InvalidEmail,
    EmptyPassword,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveId { id } => write!(f, "user id must be positive, got {id}"),
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must look like local@domain"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

impl UserValidationError {
    /// Field the error refers to, for structured error details.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonPositiveId { .. } => "userId",
            Self::EmptyUsername | Self::UsernameTooLong { .. } => "username",
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPassword => "password",
        }
    }
}

/// Store-assigned user identifier. Always positive.
///
/// The tasks service uses the same identifier to own tasks even though it
/// never validates it against the users store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct UserId(i32);

impl UserId {
    /// Validate and construct a [`UserId`].
    ///
    /// # Examples
    /// ```
    /// use taskboard::domain::UserId;
    ///
    /// assert!(UserId::new(42).is_ok());
    /// assert!(UserId::new(0).is_err());
    /// ```
    pub fn new(id: i32) -> Result<Self, UserValidationError> {
        if id <= 0 {
            return Err(UserValidationError::NonPositiveId { id });
        }
        Ok(Self(id))
    }

    /// Raw integer value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i32 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<i32> for UserId {
    type Error = UserValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address, unique across users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`]. Surrounding whitespace is dropped.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        match trimmed.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(UserValidationError::InvalidEmail),
        }
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.as_str()
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

/// Display handle chosen at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the username.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
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

/// Opaque password hash produced by a [`crate::domain::ports::PasswordHasher`].
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an already computed hash.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Borrow the encoded hash.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Registered user.
///
/// Serialises as `{"id", "username", "email"}`; the password hash never
/// leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    username: Username,
    email: Email,
    #[serde(skip)]
    password_hash: PasswordHash,
}

impl User {
    /// Assemble a user from persisted parts.
    pub fn new(id: UserId, username: Username, email: Email, password_hash: PasswordHash) -> Self {
        Self {
            id,
            username,
            email,
            password_hash,
        }
    }

    /// Store-assigned identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Display handle.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Unique email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Stored password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }
}

/// User row awaiting insertion; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: PasswordHash,
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    username: Username,
    email: Email,
    password: String,
}

impl Registration {
    /// Validate raw registration fields.
    ///
    /// # Examples
    /// ```
    /// use taskboard::domain::Registration;
    ///
    /// let registration = Registration::try_from_parts("ada", "ada@example.com", "s3cret")
    ///     .expect("valid registration");
    /// assert_eq!(registration.email().as_str(), "ada@example.com");
    /// ```
    pub fn try_from_parts(
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, UserValidationError> {
        let username = Username::new(username)?;
        let email = Email::new(email)?;
        if password.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }
        Ok(Self {
            username,
            email,
            password: password.to_owned(),
        })
    }

    /// Requested username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Requested email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Plain-text password, hashed before anything is stored.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Email and password pair presented at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

impl LoginCredentials {
    /// Reject empty fields; the address itself is checked by the login service.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, UserValidationError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }
        Ok(Self {
            email: email.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Presented email address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Presented password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

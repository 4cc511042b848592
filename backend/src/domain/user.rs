//! User identities and the application-level user record.
//!
//! The auth provider owns identities; the application mirrors each identity
//! that owns parcels into a `UserRecord` keyed by the provider's id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
    EmptyEmail,
    InvalidEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must look like local@domain"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap an already parsed UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Email address as reported by the auth provider.
///
/// ## Invariants
/// - Trimmed and non-empty.
/// - Exactly one `@` separating a non-empty local part and domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        let mut parts = trimmed.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || parts.next().is_some() {
            return Err(UserValidationError::InvalidEmail);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
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

/// Profile metadata supplied at sign-up and stored by the auth provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserMetadata {
    /// Display name entered on the registration form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Whether the account lists parcels.
    #[serde(default)]
    pub is_landlord: bool,
    /// Optional account type label (`locataire` for tenants).
    #[serde(
        default,
        rename = "type_utilisateur",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_type: Option<String>,
}

impl UserMetadata {
    /// Account type label carried by tenant accounts.
    pub const TENANT_ACCOUNT_TYPE: &'static str = "locataire";

    /// Whether the account registered as a tenant.
    pub fn is_tenant(&self) -> bool {
        self.account_type.as_deref() == Some(Self::TENANT_ACCOUNT_TYPE)
    }
}

/// Identity resolved from the auth provider for the current caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    id: UserId,
    email: Option<Email>,
    metadata: UserMetadata,
}

impl UserIdentity {
    /// Build an identity from validated parts.
    pub fn new(id: UserId, email: Option<Email>, metadata: UserMetadata) -> Self {
        Self {
            id,
            email,
            metadata,
        }
    }

    /// Provider-issued identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Email on file with the provider, if any.
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// Profile metadata.
    pub fn metadata(&self) -> &UserMetadata {
        &self.metadata
    }
}

/// Application-level user row mirroring a provider identity.
///
/// Created lazily and never updated afterwards: an email change at the
/// provider is not synchronised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    id: UserId,
    email: Option<Email>,
}

impl UserRecord {
    /// Build a record from validated parts.
    pub fn new(id: UserId, email: Option<Email>) -> Self {
        Self { id, email }
    }

    /// Mirror a provider identity.
    pub fn for_identity(identity: &UserIdentity) -> Self {
        Self::new(identity.id().clone(), identity.email().cloned())
    }

    /// Identifier shared with the auth provider.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Email captured when the record was created.
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }
}

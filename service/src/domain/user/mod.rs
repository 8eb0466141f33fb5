//! [`User`] definitions.

pub mod session;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{text::Line, Email};

pub use self::session::Session;

/// Platform user.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Email`] of this [`User`] used as a login.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    #[serde(skip)]
    pub password_hash: PasswordHash,

    /// First name of this [`User`].
    pub first_name: Line,

    /// Last name of this [`User`].
    pub last_name: Line,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// Indicator whether this [`User`] is allowed to sign in.
    pub is_active: bool,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`User`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Role of a [`User`]."]
    enum Role {
        #[doc = "Administrator managing other [`User`]s."]
        Admin,

        #[doc = "Regular [`User`]."]
        User,
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Deserialize, Display, Eq, PartialEq)]
#[serde(try_from = "String")]
pub struct Password(String);

impl Password {
    /// Minimum length of a [`Password`].
    pub const MIN_LEN: usize = 6;

    /// Creates a new [`Password`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `password` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        password.chars().count() >= Self::MIN_LEN && password.len() <= 128
    }
}

impl TryFrom<String> for Password {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("password must be 6 to 128 characters long")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// [Argon2id] password hash of a [`User`] in a [PHC string format].
///
/// [Argon2id]: https://en.wikipedia.org/wiki/Argon2
/// [PHC string format]: https://github.com/P-H-C/phc-string-format
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] with a random salt.
    ///
    /// # Errors
    ///
    /// If the hashing fails.
    pub fn new(password: &Password) -> Result<Self, argon2::password_hash::Error> {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher as _, SaltString},
            Argon2,
        };

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map(|h| Self(h.to_string()))
    }

    /// Verifies the given [`Password`] against this [`PasswordHash`] in
    /// constant time.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        use argon2::{password_hash, Argon2, PasswordVerifier as _};

        password_hash::PasswordHash::new(&self.0).is_ok_and(|h| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &h)
                .is_ok()
        })
    }

    /// Hashes the given [`Password`] on a blocking thread, keeping Argon2
    /// off the async workers.
    ///
    /// # Errors
    ///
    /// If the hashing fails.
    pub async fn hash(password: Password) -> Result<Self, HashingError> {
        tokio::task::spawn_blocking(move || Self::new(&password))
            .await?
            .map_err(HashingError::Argon2)
    }

    /// Same as [`PasswordHash::verify()`], but runs on a blocking thread.
    ///
    /// # Errors
    ///
    /// If the blocking task fails.
    pub async fn matches(
        &self,
        password: Password,
    ) -> Result<bool, HashingError> {
        let hash = self.clone();
        Ok(tokio::task::spawn_blocking(move || hash.verify(&password)).await?)
    }
}

/// Error of hashing or verifying a [`Password`] on a blocking thread.
#[derive(Debug, Display, Error, From)]
pub enum HashingError {
    /// Argon2 failed to hash the [`Password`].
    #[display("Argon2 failed: {_0}")]
    #[from(ignore)]
    Argon2(#[error(not(source))] argon2::password_hash::Error),

    /// Blocking task panicked or was cancelled.
    #[display("Blocking task failed: {_0}")]
    Task(tokio::task::JoinError),
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`User`] was modified.
pub type ModificationDateTime = DateTimeOf<(User, unit::Modification)>;

/// [`DateTime`] when a [`User`] was deleted.
pub type DeletionDateTime = DateTimeOf<(User, unit::Deletion)>;

#[cfg(test)]
mod spec {
    use super::{Password, PasswordHash, Role};

    #[test]
    fn password_length() {
        assert!(Password::new("12345").is_none());
        assert!(Password::new("123456").is_some());
        assert!(Password::new("x".repeat(129)).is_none());
    }

    #[test]
    fn hash_verifies_only_original_password() {
        let password = Password::new("s3cr3t-pass").unwrap();
        let hash = PasswordHash::new(&password).unwrap();

        assert!(hash.as_ref().starts_with("$argon2id$"));
        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("wrong-pass").unwrap()));
    }

    #[test]
    fn hashes_are_salted() {
        let password = Password::new("s3cr3t-pass").unwrap();

        assert_ne!(
            PasswordHash::new(&password).unwrap(),
            PasswordHash::new(&password).unwrap(),
        );
    }

    #[tokio::test]
    async fn hashes_off_the_async_workers() {
        let password = Password::new("s3cr3t-pass").unwrap();

        let hash = PasswordHash::hash(password.clone()).await.unwrap();

        assert!(hash.matches(password).await.unwrap());
        assert!(!hash
            .matches(Password::new("wrong-pass").unwrap())
            .await
            .unwrap());
    }

    #[test]
    fn role_defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}

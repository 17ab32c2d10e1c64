//! Institution and user credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};

use crate::{Channel, Error, Result};

/// Credentials issued to an institution.
///
/// Immutable once built; the authenticator holds the only copy.
///
/// # Example
///
/// ```
/// use gtn_rs::{Channel, Credential};
///
/// let credential = Credential::builder()
///     .app_key("app-key")
///     .app_secret("app-secret")
///     .private_key("MIIEvQIBADANBg...")
///     .institution("INST")
///     .user_id("svc-user")
///     .institution_id(42)
///     .channel(Channel::trade())
///     .build()
///     .expect("all required fields set");
///
/// assert_eq!(credential.app_key(), "app-key");
/// ```
#[derive(Clone)]
pub struct Credential {
    app_key: String,
    app_secret: SecretString,
    private_key: SecretString,
    institution: String,
    user_id: String,
    institution_id: i64,
    channel: Channel,
}

impl Credential {
    /// Start building a credential.
    pub fn builder() -> CredentialBuilder {
        CredentialBuilder::default()
    }

    /// Load a credential from `GTN_*` environment variables.
    ///
    /// Required: `GTN_APP_KEY`, `GTN_APP_SECRET`, `GTN_PRIVATE_KEY`,
    /// `GTN_INSTITUTION`, `GTN_USER_ID`. Optional: `GTN_CHANNEL`
    /// (default `TRADE`), `GTN_INSTITUTION_ID`.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| Error::Config(format!("{name} must be set")))
        };

        let mut builder = Self::builder()
            .app_key(required("GTN_APP_KEY")?)
            .app_secret(required("GTN_APP_SECRET")?)
            .private_key(required("GTN_PRIVATE_KEY")?)
            .institution(required("GTN_INSTITUTION")?)
            .user_id(required("GTN_USER_ID")?);

        if let Ok(channel) = std::env::var("GTN_CHANNEL") {
            builder = builder.channel(Channel::new(channel));
        }
        if let Ok(id) = std::env::var("GTN_INSTITUTION_ID") {
            let id = id
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("GTN_INSTITUTION_ID is not a number: {id}")))?;
            builder = builder.institution_id(id);
        }

        builder.build()
    }

    /// The application key; also sent as the `Throttle-Key` header.
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// The institution code.
    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// The user id placed in assertions.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The numeric institution id, if one was configured.
    pub fn institution_id(&self) -> Option<i64> {
        (self.institution_id > 0).then_some(self.institution_id)
    }

    /// The API channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub(crate) fn private_key(&self) -> &SecretString {
        &self.private_key
    }

    /// `Basic base64(appKey:appSecret)` for token issuance calls.
    pub(crate) fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.app_key, self.app_secret.expose_secret());
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .field("institution", &self.institution)
            .field("user_id", &self.user_id)
            .field("institution_id", &self.institution_id)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Builder for [`Credential`].
#[derive(Default)]
pub struct CredentialBuilder {
    app_key: Option<String>,
    app_secret: Option<SecretString>,
    private_key: Option<SecretString>,
    institution: Option<String>,
    user_id: Option<String>,
    institution_id: Option<i64>,
    channel: Option<Channel>,
}

impl CredentialBuilder {
    /// Set the application key.
    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Set the application secret.
    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(SecretString::from(app_secret.into()));
        self
    }

    /// Set the private signing key (hex, base64, or PEM encoded PKCS#8).
    pub fn private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(SecretString::from(private_key.into()));
        self
    }

    /// Set the institution code.
    pub fn institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Set the user id.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the numeric institution id. Values <= 0 mean "not set".
    pub fn institution_id(mut self, institution_id: i64) -> Self {
        self.institution_id = Some(institution_id);
        self
    }

    /// Set the API channel.
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Build the credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required field is missing or empty.
    pub fn build(self) -> Result<Credential> {
        fn require<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| Error::Config(format!("credential field `{name}` is required")))
        }

        let app_key = require(self.app_key, "app_key")?;
        if app_key.trim().is_empty() {
            return Err(Error::Config("credential field `app_key` is empty".to_string()));
        }

        Ok(Credential {
            app_key,
            app_secret: require(self.app_secret, "app_secret")?,
            private_key: require(self.private_key, "private_key")?,
            institution: require(self.institution, "institution")?,
            user_id: require(self.user_id, "user_id")?,
            institution_id: self.institution_id.unwrap_or(-1),
            channel: self.channel.unwrap_or_default(),
        })
    }
}

/// Login name and password for the user/password flow.
#[derive(Clone)]
pub struct UserCredential {
    login_name: String,
    password: SecretString,
    institution: String,
}

impl UserCredential {
    /// Create user credentials.
    pub fn new(
        login_name: impl Into<String>,
        password: impl Into<String>,
        institution: impl Into<String>,
    ) -> Self {
        Self {
            login_name: login_name.into(),
            password: SecretString::from(password.into()),
            institution: institution.into(),
        }
    }

    /// The login name.
    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    /// The institution code.
    pub fn institution(&self) -> &str {
        &self.institution
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("login_name", &self.login_name)
            .field("password", &"[REDACTED]")
            .field("institution", &self.institution)
            .finish()
    }
}

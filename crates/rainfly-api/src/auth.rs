// Access-token handling for the cloud API.
//
// The cloud authorizes every request with a bearer access token issued
// by the identity provider. Token acquisition/refresh is owned by the
// caller; this module only carries the secret and renders the header.

use secrecy::{ExposeSecret, SecretString};

/// A bearer access token for the cloud API.
///
/// Wrapped in [`SecretString`] so it never appears in `Debug` output
/// or log lines.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Render the `Authorization` header value.
    pub(crate) fn header_value(&self) -> Result<reqwest::header::HeaderValue, crate::Error> {
        let mut value = reqwest::header::HeaderValue::from_str(self.0.expose_secret()).map_err(
            |_| crate::Error::Authentication {
                message: "access token contains invalid header characters".into(),
            },
        )?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<SecretString> for AccessToken {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

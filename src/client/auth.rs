use secrecy::{ExposeSecret, SecretString};

/// Basic-auth credentials for the Mesos HTTP API.
///
/// Only constructed when both parts are non-empty, so holding a `Credentials`
/// means there is something to attach. The password is redacted from `Debug`.
#[derive(Clone, Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Returns `None` unless both username and password are non-empty.
    pub fn from_parts(username: Option<String>, password: Option<SecretString>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        let password = password.filter(|p| !p.expose_secret().is_empty())?;

        Some(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Attach the credentials as an `Authorization: Basic` header.
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_both() {
        assert!(Credentials::from_parts(None, None).is_none());
        assert!(Credentials::from_parts(Some("admin".into()), None).is_none());
        assert!(Credentials::from_parts(None, Some(SecretString::from("secret"))).is_none());
    }

    #[test]
    fn test_from_parts_rejects_empty_values() {
        assert!(
            Credentials::from_parts(Some(String::new()), Some(SecretString::from("secret")))
                .is_none()
        );
        assert!(Credentials::from_parts(Some("admin".into()), Some(SecretString::from(""))).is_none());
    }

    #[test]
    fn test_from_parts_with_both() {
        let creds = Credentials::from_parts(Some("admin".into()), Some(SecretString::from("secret")));

        let creds = creds.expect("credentials should be present");
        assert_eq!(creds.username(), "admin");
        assert_eq!(creds.password().expose_secret(), "secret");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::from_parts(Some("admin".into()), Some(SecretString::from("hunter2")))
            .expect("credentials should be present");

        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}

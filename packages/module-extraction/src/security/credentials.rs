//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive values.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when building the outgoing request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Azure OpenAI deployment credentials.
#[derive(Clone)]
pub struct ModelCredentials {
    /// API key (secret)
    pub api_key: SecretString,

    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com/`
    pub endpoint: String,

    /// Deployment name
    pub deployment: String,

    /// REST API version
    pub api_version: String,
}

impl ModelCredentials {
    pub const DEFAULT_API_VERSION: &'static str = "2024-02-15-preview";

    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

impl fmt::Debug for ModelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCredentials")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firecrawl_key_is_redacted() {
        let key = SecretString::from("fc-0123456789abcdef");
        assert_eq!(format!("{:?} {}", key, key), "[REDACTED] [REDACTED]");
        assert_eq!(key.clone().expose(), "fc-0123456789abcdef");
    }

    #[test]
    fn test_model_credentials_debug_hides_key() {
        let creds = ModelCredentials::new("azure-secret", "https://r.openai.azure.com/", "gpt-4o")
            .with_api_version("2024-06-01");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("azure-secret"));
        assert!(debug.contains("gpt-4o"));
        assert!(debug.contains("2024-06-01"));
        assert_eq!(creds.api_key.expose(), "azure-secret");
    }
}

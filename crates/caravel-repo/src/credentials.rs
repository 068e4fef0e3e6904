//! Repository credentials with redirect protection
//!
//! Credentials are scoped to URL prefixes and are never sent after a
//! cross-origin redirect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::error::{RepoError, Result};

/// Credential types supported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Basic authentication (username/password)
    Basic { username: String, password: String },

    /// Bearer token authentication
    Bearer { token: String },

    /// Environment variable references (CI/CD friendly)
    Env {
        username_var: String,
        password_var: String,
    },
}

impl Credentials {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Basic { username, password } => Ok(ResolvedCredentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            Credentials::Bearer { token } => Ok(ResolvedCredentials::Bearer {
                token: token.clone(),
            }),
            Credentials::Env {
                username_var,
                password_var,
            } => {
                let username = std::env::var(username_var).map_err(|_| RepoError::AuthFailed {
                    message: format!("Environment variable {} not set", username_var),
                })?;
                let password = std::env::var(password_var).map_err(|_| RepoError::AuthFailed {
                    message: format!("Environment variable {} not set", password_var),
                })?;
                Ok(ResolvedCredentials::Basic { username, password })
            }
        }
    }
}

/// Resolved credentials ready for use
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl ResolvedCredentials {
    /// Get the Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            ResolvedCredentials::Basic { username, password } => {
                let encoded = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{}:{}", username, password),
                );
                format!("Basic {}", encoded)
            }
            ResolvedCredentials::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

/// Scoped credentials - maps URL prefixes to credentials.
/// Credentials are only attached to URLs inside their scope.
#[derive(Debug, Clone, Default)]
pub struct ScopedCredentials {
    scopes: HashMap<String, ResolvedCredentials>,
}

impl ScopedCredentials {
    /// Add credentials for a URL scope
    pub fn add(&mut self, url_prefix: &str, credentials: ResolvedCredentials) {
        let prefix = url_prefix.trim_end_matches('/').to_string();
        self.scopes.insert(prefix, credentials);
    }

    /// Get credentials for a URL (by longest matching prefix)
    pub fn for_url(&self, url: &str) -> Option<&ResolvedCredentials> {
        self.scopes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, creds)| creds)
    }

    /// Check if two URLs are same-origin (for redirect safety)
    pub fn same_origin(url1: &str, url2: &str) -> bool {
        match (Url::parse(url1), Url::parse(url2)) {
            (Ok(u1), Ok(u2)) => {
                u1.scheme() == u2.scheme()
                    && u1.host() == u2.host()
                    && u1.port_or_known_default() == u2.port_or_known_default()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let creds = Credentials::basic("user", "pass").resolve().unwrap();
        // "user:pass" in base64
        assert_eq!(creds.auth_header(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_bearer_auth_header() {
        let creds = Credentials::bearer("secret").resolve().unwrap();
        assert_eq!(creds.auth_header(), "Bearer secret");
    }

    #[test]
    fn test_env_credentials_missing_var() {
        let creds = Credentials::Env {
            username_var: "CARAVEL_TEST_NO_SUCH_USER_VAR".to_string(),
            password_var: "CARAVEL_TEST_NO_SUCH_PASS_VAR".to_string(),
        };
        assert!(matches!(
            creds.resolve(),
            Err(RepoError::AuthFailed { .. })
        ));
    }

    #[test]
    fn test_scoped_credentials() {
        let mut scoped = ScopedCredentials::default();
        scoped.add(
            "https://private.example.com",
            ResolvedCredentials::Bearer {
                token: "secret".to_string(),
            },
        );

        assert!(scoped
            .for_url("https://private.example.com/index.yaml")
            .is_some());
        assert!(scoped
            .for_url("https://public.example.com/index.yaml")
            .is_none());
    }

    #[test]
    fn test_same_origin() {
        assert!(ScopedCredentials::same_origin(
            "https://example.com/foo",
            "https://example.com/bar"
        ));
        assert!(ScopedCredentials::same_origin(
            "https://example.com:443/foo",
            "https://example.com/bar"
        ));
        assert!(!ScopedCredentials::same_origin(
            "https://example.com/foo",
            "https://other.com/bar"
        ));
        assert!(!ScopedCredentials::same_origin(
            "https://example.com/foo",
            "http://example.com/bar"
        ));
    }

    #[test]
    fn test_credentials_serde() {
        let creds = Credentials::basic("user", "pass");
        let yaml = serde_yaml::to_string(&creds).unwrap();
        assert!(yaml.contains("type: basic"));

        let parsed: Credentials = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, creds);
    }
}

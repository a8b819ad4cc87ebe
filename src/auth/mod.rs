//! Bearer token supply for the directory tool server.
//!
//! Acquiring tokens (interactive or silent OAuth flows) is the job of external
//! tooling. This module only hands an already-issued delegated token to the
//! transport, either from configuration or from a one-time hidden prompt.

use crate::config::AuthConfig;
use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Supplies the bearer token sent to the tool server.
///
/// The token is treated as opaque and is read once when the transport
/// connects; it is not refreshed during a turn.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token fixed at startup (config file or `DIRCHAT_ACCESS_TOKEN`).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        normalize_token(&self.token)
    }
}

/// Asks for a token on the terminal the first time one is needed.
pub struct PromptTokenProvider {
    cached: OnceCell<String>,
}

impl PromptTokenProvider {
    pub fn new() -> Self {
        Self {
            cached: OnceCell::new(),
        }
    }
}

#[async_trait]
impl TokenProvider for PromptTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .cached
            .get_or_try_init(|| async {
                let raw = tokio::task::spawn_blocking(|| {
                    dialoguer::Password::new()
                        .with_prompt("Paste a delegated access token for the directory tool server")
                        .allow_empty_password(false)
                        .interact()
                })
                .await??;
                normalize_token(&raw)
            })
            .await?;
        Ok(token.clone())
    }
}

/// Trim whitespace and an accidental `Bearer ` prefix; reject empty tokens.
pub fn normalize_token(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let token = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if trimmed.eq_ignore_ascii_case("bearer") => "",
        _ => trimmed,
    };
    if token.is_empty() {
        bail!("Access token is empty");
    }
    Ok(token.to_string())
}

/// Pick the token source for the current configuration.
pub fn create_token_provider(config: &AuthConfig) -> Result<Box<dyn TokenProvider>> {
    match config.access_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Ok(Box::new(StaticTokenProvider::new(token))),
        _ if config.prompt_for_token => Ok(Box::new(PromptTokenProvider::new())),
        _ => bail!(
            "No access token configured. Set DIRCHAT_ACCESS_TOKEN or [auth].access_token, \
             or enable [auth].prompt_for_token."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_bearer_prefix() {
        assert_eq!(normalize_token("  Bearer abc.def.ghi \n").unwrap(), "abc.def.ghi");
        assert_eq!(normalize_token("bearer xyz").unwrap(), "xyz");
        assert_eq!(normalize_token("plain").unwrap(), "plain");
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(normalize_token("   ").is_err());
        assert!(normalize_token("Bearer ").is_err());
        assert!(normalize_token("  BEARER\t ").is_err());
    }

    #[test]
    fn normalize_keeps_tokens_that_only_start_with_bearer() {
        assert_eq!(normalize_token("bearerish.token").unwrap(), "bearerish.token");
        assert_eq!(normalize_token("BEARER\tabc").unwrap(), "abc");
    }

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("eyJ.token.sig");
        assert_eq!(provider.access_token().await.unwrap(), "eyJ.token.sig");
    }

    #[tokio::test]
    async fn factory_prefers_configured_token() {
        let config = AuthConfig {
            access_token: Some("configured".into()),
            prompt_for_token: true,
        };
        let provider = create_token_provider(&config).unwrap();
        assert_eq!(provider.access_token().await.unwrap(), "configured");
    }

    #[test]
    fn factory_fails_without_token_or_prompt() {
        let config = AuthConfig {
            access_token: None,
            prompt_for_token: false,
        };
        let err = create_token_provider(&config).err().unwrap();
        assert!(err.to_string().contains("No access token configured"));
    }

    #[test]
    fn factory_falls_back_to_prompt() {
        let config = AuthConfig {
            access_token: Some("  ".into()),
            prompt_for_token: true,
        };
        assert!(create_token_provider(&config).is_ok());
    }
}

use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CODE_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_ASSET_MODEL: &str = "gemini-2.5-flash-image";

/// Environment variable holding the Gemini credential. The settings form
/// points at this variable instead of exposing the key itself.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Provider identities the settings surface offers. Only Gemini has a
/// wired backend; the rest resolve to an unconfigured placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Grok,
    Custom,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Grok,
        ProviderKind::Custom,
    ];

    /// Human-readable name for the settings form.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::OpenAi => "OpenAI (GPT)",
            ProviderKind::Grok => "xAI (Grok)",
            ProviderKind::Custom => "Custom (Local LLM)",
        }
    }

    fn id(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Grok => "grok",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One assistant panel's provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn gemini(model: &str) -> Self {
        Self {
            kind: ProviderKind::Gemini,
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Change the provider identity. The model identifier survives the
    /// switch; only the identity changes.
    pub fn switch_kind(&mut self, kind: ProviderKind) {
        self.kind = kind;
    }

    /// Whether the settings form lets the user type into the key field.
    /// The Gemini credential lives in the environment and is read-only.
    pub fn credential_editable(&self) -> bool {
        self.kind != ProviderKind::Gemini
    }

    /// What the credential field shows. Never the cleartext key.
    pub fn credential_display(&self) -> String {
        match self.kind {
            ProviderKind::Gemini => format!("env:{GEMINI_API_KEY_ENV}"),
            _ => match self.api_key.as_deref() {
                Some(key) if !key.is_empty() => "•".repeat(key.chars().count()),
                _ => String::new(),
            },
        }
    }
}

/// Per-panel provider selections, edited through the settings overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub code: ProviderConfig,
    pub asset: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub api_url: String,
    pub code_model: String,
    pub asset_model: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = std::env::var(GEMINI_API_KEY_ENV).ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(v)
            }
        });
        let api_url =
            std::env::var("GAMEGEN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let code_model = std::env::var("GAMEGEN_CODE_MODEL")
            .unwrap_or_else(|_| DEFAULT_CODE_MODEL.to_string());
        let asset_model = std::env::var("GAMEGEN_ASSET_MODEL")
            .unwrap_or_else(|_| DEFAULT_ASSET_MODEL.to_string());

        Ok(Self {
            gemini_api_key,
            api_url,
            code_model,
            asset_model,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid GAMEGEN_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if self.gemini_api_key.is_none() {
            eprintln!("⚠️  WARNING: {GEMINI_API_KEY_ENV} not set");
            eprintln!("    Generation requests will fail until it is exported.");
        }

        for (which, model) in [("code", &self.code_model), ("asset", &self.asset_model)] {
            if !model.starts_with("gemini-") {
                eprintln!("⚠️  WARNING: Unrecognized {which} model name: {model}");
                eprintln!("    Valid examples:");
                eprintln!("    - {DEFAULT_CODE_MODEL}");
                eprintln!("    - {DEFAULT_ASSET_MODEL}");
            }
        }

        Ok(())
    }

    /// Initial settings state: both panels on Gemini with their default
    /// models, credentials left to the environment.
    pub fn initial_settings(&self) -> Settings {
        Settings {
            code: ProviderConfig::gemini(&self.code_model),
            asset: ProviderConfig::gemini(&self.asset_model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_reads_env_overrides() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(GEMINI_API_KEY_ENV, "test-key");
        std::env::set_var("GAMEGEN_CODE_MODEL", "gemini-experimental");
        std::env::remove_var("GAMEGEN_API_URL");
        std::env::remove_var("GAMEGEN_ASSET_MODEL");

        let config = Config::load().unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("test-key"));
        assert_eq!(config.code_model, "gemini-experimental");
        assert_eq!(config.asset_model, DEFAULT_ASSET_MODEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);

        std::env::remove_var(GEMINI_API_KEY_ENV);
        std::env::remove_var("GAMEGEN_CODE_MODEL");
    }

    #[test]
    fn test_blank_api_key_counts_as_unset() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(GEMINI_API_KEY_ENV, "   ");
        let config = Config::load().unwrap();
        assert_eq!(config.gemini_api_key, None);
        std::env::remove_var(GEMINI_API_KEY_ENV);
    }

    #[test]
    fn test_validate_rejects_malformed_url() {
        let config = Config {
            gemini_api_key: Some("key".to_string()),
            api_url: "generativelanguage.googleapis.com".to_string(),
            code_model: DEFAULT_CODE_MODEL.to_string(),
            asset_model: DEFAULT_ASSET_MODEL.to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_switching_provider_preserves_model() {
        let mut provider = ProviderConfig::gemini("gemini-3-pro-preview");
        provider.switch_kind(ProviderKind::OpenAi);
        assert_eq!(provider.kind, ProviderKind::OpenAi);
        assert_eq!(provider.model, "gemini-3-pro-preview");

        provider.switch_kind(ProviderKind::Gemini);
        assert_eq!(provider.model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_gemini_credential_is_never_shown_or_editable() {
        let provider = ProviderConfig::gemini(DEFAULT_CODE_MODEL);
        assert!(!provider.credential_editable());
        assert_eq!(provider.credential_display(), "env:GEMINI_API_KEY");
    }

    #[test]
    fn test_other_credentials_render_masked() {
        let mut provider = ProviderConfig::gemini(DEFAULT_CODE_MODEL);
        provider.switch_kind(ProviderKind::OpenAi);
        provider.api_key = Some("sk-12345".to_string());

        assert!(provider.credential_editable());
        assert_eq!(provider.credential_display(), "••••••••");
        assert!(!provider.credential_display().contains("sk-12345"));
    }
}

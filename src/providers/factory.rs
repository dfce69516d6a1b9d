use crate::config::{Config, Provider, ProviderConfig};
use crate::core::error::EloyError;
use crate::providers::{
    LLMProvider, offline::OfflineProvider, openai_compatible::OpenAICompatibleProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-call settings that are not tied to a single provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub assistant_name: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        Self {
            assistant_name: config.assistant_name.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

type ProviderCreator = Box<
    dyn Fn(&ProviderConfig, &ProviderSettings) -> Result<Arc<dyn LLMProvider>, EloyError>
        + Send
        + Sync,
>;

pub struct ProviderFactory {
    creators: HashMap<Provider, ProviderCreator>,
}

impl ProviderFactory {
    pub fn new() -> Self {
        let mut creators: HashMap<Provider, ProviderCreator> = HashMap::new();

        for provider in [Provider::Groq, Provider::OpenAI, Provider::OpenRouter] {
            let creator: ProviderCreator = Box::new(
                move |config: &ProviderConfig,
                      settings: &ProviderSettings|
                      -> Result<Arc<dyn LLMProvider>, EloyError> {
                    let Some(api_key) = config.api_key.clone() else {
                        tracing::warn!(?provider, "no API key configured, answering in offline mode");
                        return Ok(Arc::new(OfflineProvider::new(&settings.assistant_name)));
                    };
                    let base_url = config
                        .base_url
                        .clone()
                        .unwrap_or_else(|| provider.default_base_url().to_string());
                    let model = config
                        .model
                        .clone()
                        .unwrap_or_else(|| provider.default_model().to_string());
                    let client = OpenAICompatibleProvider::new(
                        base_url,
                        api_key,
                        model,
                        settings.temperature,
                        settings.timeout,
                    )?;
                    Ok(Arc::new(client))
                },
            );
            creators.insert(provider, creator);
        }

        Self { creators }
    }

    pub fn create(
        &self,
        provider: &Provider,
        config: &ProviderConfig,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn LLMProvider>, EloyError> {
        self.creators
            .get(provider)
            .ok_or_else(|| EloyError::Config(format!("Provider not found: {:?}", provider)))
            .and_then(|creator| creator(config, settings))
    }

    pub fn from_config(config: &Config) -> Result<Arc<dyn LLMProvider>, EloyError> {
        Self::new().create(
            &config.active_provider,
            &config.provider_config(),
            &ProviderSettings::from(config),
        )
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_offline_mode() {
        let provider = ProviderFactory::from_config(&Config::default()).unwrap();
        assert_eq!(provider.model(), "offline");
    }

    #[test]
    fn configured_key_builds_a_remote_client() {
        let mut config = Config::default();
        config.providers.insert(
            Provider::Groq,
            ProviderConfig {
                api_key: Some("gsk-test".to_string()),
                base_url: None,
                model: Some("llama-3.1-8b-instant".to_string()),
            },
        );
        let provider = ProviderFactory::from_config(&config).unwrap();
        assert_eq!(provider.model(), "llama-3.1-8b-instant");
    }
}

use std::fmt::Debug;

/// Builder for [`AnthropicConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnthropicConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
}

impl AnthropicConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            max_tokens: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL, without the `/v1` suffix.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the maximum number of tokens to generate per response.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> AnthropicConfig {
        AnthropicConfig {
            api_key: self.api_key,
            model: self
                .model
                .unwrap_or_else(|| "claude-3-haiku-20240307".to_string()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            max_tokens: self.max_tokens.unwrap_or(4096),
        }
    }
}

impl Debug for AnthropicConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Configuration for the Anthropic provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnthropicConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) max_tokens: u32,
}

impl AnthropicConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

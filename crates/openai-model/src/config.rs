use std::fmt::Debug;

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    streaming: bool,
    native_tools: bool,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            streaming: true,
            native_tools: true,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Enables or disables server-sent event streaming. Hosts that don't
    /// stream get a plain request and the whole answer at once.
    #[inline]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Enables or disables native function calling. Without it no tool
    /// definitions are sent and tool history is folded into assistant
    /// messages.
    #[inline]
    pub fn with_native_tools(mut self, native_tools: bool) -> Self {
        self.native_tools = native_tools;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            streaming: self.streaming,
            native_tools: self.native_tools,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("streaming", &self.streaming)
            .field("native_tools", &self.native_tools)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) streaming: bool,
    pub(crate) native_tools: bool,
}

impl OpenAIConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<deducted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("streaming", &self.streaming)
            .field("native_tools", &self.native_tools)
            .finish()
    }
}

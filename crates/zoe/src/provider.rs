//! The model providers offered at startup.

use std::fmt::{self, Display};

use zoe_anthropic_model::{AnthropicConfigBuilder, AnthropicProvider};
use zoe_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::session::SessionBuilder;

const ATOMA_BASE_URL: &str = "https://api.atoma.network/v1";

/// A model preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Claude 3 Haiku on the Anthropic API.
    Claude,
    /// GPT-4o mini on the OpenAI API.
    OpenAI,
    /// Llama 3.3 hosted on Atoma.
    Llama,
    /// DeepSeek R1 hosted on Atoma.
    DeepSeekR1,
}

impl ProviderKind {
    /// Every preset, in menu order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Claude,
        ProviderKind::OpenAI,
        ProviderKind::Llama,
        ProviderKind::DeepSeekR1,
    ];

    /// Returns the name shown in menus.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude",
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Llama => "LLAMA",
            ProviderKind::DeepSeekR1 => "DeepSeekR1",
        }
    }

    /// Returns the environment variable holding the credential.
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Llama | ProviderKind::DeepSeekR1 => "ATOMA_API_KEY",
        }
    }

    /// Returns the model identifier sent to the API.
    pub fn model(self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude-3-haiku-20240307",
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Llama => "meta-llama/Llama-3.3-70B-Instruct",
            ProviderKind::DeepSeekR1 => "deepseek-ai/DeepSeek-R1",
        }
    }

    /// Creates a session builder talking to this preset.
    ///
    /// Atoma-hosted models neither stream nor call tools natively.
    pub fn session_builder(self, api_key: String) -> SessionBuilder {
        match self {
            ProviderKind::Claude => {
                let config = AnthropicConfigBuilder::with_api_key(api_key)
                    .with_model(self.model())
                    .build();
                SessionBuilder::with_model_provider(AnthropicProvider::new(config))
            }
            ProviderKind::OpenAI => {
                let config = OpenAIConfigBuilder::with_api_key(api_key)
                    .with_model(self.model())
                    .build();
                SessionBuilder::with_model_provider(OpenAIProvider::new(config))
            }
            ProviderKind::Llama | ProviderKind::DeepSeekR1 => {
                let config = OpenAIConfigBuilder::with_api_key(api_key)
                    .with_base_url(ATOMA_BASE_URL)
                    .with_model(self.model())
                    .with_streaming(false)
                    .with_native_tools(false)
                    .build();
                SessionBuilder::with_model_provider(OpenAIProvider::new(config))
            }
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

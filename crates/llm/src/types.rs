use std::fmt;

/// Which backend writes answers. Matched case-insensitively from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Extractive answers only.
    Disabled,
    OpenAI,
    Ollama,
}

impl ProviderType {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("off") {
            Some(Self::Disabled)
        } else if name.eq_ignore_ascii_case("openai") {
            Some(Self::OpenAI)
        } else if name.eq_ignore_ascii_case("ollama") {
            Some(Self::Ollama)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "none",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

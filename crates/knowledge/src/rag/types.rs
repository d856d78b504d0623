//! Query and answer types.

use serde::{Deserialize, Serialize};

/// Answer returned when nothing in the store matches the question.
pub const FALLBACK_ANSWER: &str = "I don't have enough information to answer your question. \
Please check the course materials or ask on the Discourse forum.";

/// Path prefix under which records without a url are served.
pub const RECORD_LINK_PREFIX: &str = "/api/records/";

/// A student question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub question: String,

    /// Free-text context supplied alongside the question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,

    /// Base64 image or `data:<mime>;base64,` URL, forwarded to the LLM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Query {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Text used for retrieval: the question plus any attachment.
    pub fn search_text(&self) -> String {
        match self.attachment.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{} {}", self.question.trim(), extra),
            _ => self.question.trim().to_string(),
        }
    }
}

/// A source link attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLink {
    pub url: String,
    pub text: String,
}

/// Response to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub links: Vec<AnswerLink>,

    /// Highest keyword score among the matches; logging only
    #[serde(skip)]
    pub max_score: u32,
}

impl Answer {
    pub fn new(answer: String, links: Vec<AnswerLink>, max_score: u32) -> Self {
        Self {
            answer,
            links,
            max_score,
        }
    }

    /// The fixed answer for questions with no matching content.
    pub fn fallback() -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_string(),
            links: Vec::new(),
            max_score: 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.links.is_empty() && self.answer == FALLBACK_ANSWER
    }
}

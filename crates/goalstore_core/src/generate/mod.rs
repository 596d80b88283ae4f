//! Text generation seam for goal decomposition.
//!
//! The task store never calls a generator itself; the goal planner does,
//! then hands the raw text to extraction.

pub mod chat_client;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use chat_client::ChatCompletionsGenerator;

/// Produces free-form task list text for a goal.
pub trait TaskGenerator {
    fn generate(&self, goal_text: &str) -> Result<String, GenerationError>;
}

impl<T: TaskGenerator + ?Sized> TaskGenerator for &T {
    fn generate(&self, goal_text: &str) -> Result<String, GenerationError> {
        (**self).generate(goal_text)
    }
}

/// Classification of generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Connection failure or timeout.
    Network,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    Server,
    /// Other HTTP 4xx (auth, bad request).
    Client,
    /// Response body did not carry generated text.
    Parse,
}

impl GenerationErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::Server)
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            400..=499 => Self::Client,
            _ => Self::Server,
        }
    }
}

impl Display for GenerationErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Network => "network error",
            Self::RateLimited => "rate limited",
            Self::Server => "server error",
            Self::Client => "client error",
            Self::Parse => "parse error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: GenerationErrorKind::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Parse, message)
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl Error for GenerationError {}

/// Instruction sent to the generator for one goal.
pub fn decomposition_prompt(goal_text: &str) -> String {
    format!(
        "Break the following goal into a single flat numbered list of actionable tasks. \
         Each task should be a specific, concrete action, not a category or phase. \
         If the goal mentions a timeframe, distribute tasks across that timeframe. \
         Output ONLY the numbered list. No introductions, no summaries, no section headers, \
         no sub-lists, no markdown formatting, no commentary before or after the list. \
         Maximum 12 tasks.\n\nGoal: {goal_text}"
    )
}

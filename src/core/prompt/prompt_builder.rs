// Prompt construction for every relay action family.
//
// Building a prompt is pure string assembly: no I/O, no retained state.
// Validation of the request's discriminators happens in the constructors,
// so an invalid action or template never reaches the generation gateway.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-text context fields are clipped to this many characters before
/// interpolation, bounding token cost and latency. Truncation is a silent
/// prefix take, not an error.
pub const MAX_CONTEXT_CHARS: usize = 15_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Popup menu actions that stream a rewritten selection back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Rephrase,
    Summarize,
}

impl ActionKind {
    pub fn parse(raw: &str) -> Result<Self, PromptError> {
        match raw {
            "rephrase" => Ok(ActionKind::Rephrase),
            "summarize" => Ok(ActionKind::Summarize),
            other => Err(PromptError::InvalidRequest(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

/// Composer templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTemplate {
    FormalEmail,
    TweetIdeas,
}

impl ComposeTemplate {
    pub fn parse(raw: &str) -> Result<Self, PromptError> {
        match raw {
            "formal_email" => Ok(ComposeTemplate::FormalEmail),
            "tweet_ideas" => Ok(ComposeTemplate::TweetIdeas),
            other => Err(PromptError::InvalidRequest(format!(
                "unknown template '{other}'"
            ))),
        }
    }
}

/// Free-form fields the composer collects. Which ones matter depends on
/// the template; absent fields interpolate as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeContext {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub points: Option<String>,
    pub topic: Option<String>,
}

/// A validated request for one generated response. Each variant carries
/// exactly the fields its template interpolates.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptRequest {
    Chat {
        message: String,
        context: Option<String>,
    },
    Action {
        action: ActionKind,
        text: String,
    },
    DocumentSummary {
        text: String,
    },
    Compose {
        template: ComposeTemplate,
        context: ComposeContext,
    },
    Analyze {
        question: String,
        context: String,
    },
    CreateEvent {
        text: String,
        today: NaiveDate,
    },
}

impl PromptRequest {
    pub fn chat(message: impl Into<String>, context: Option<String>) -> Self {
        PromptRequest::Chat {
            message: message.into(),
            context,
        }
    }

    /// Fails fast on an action name outside `{rephrase, summarize}`.
    pub fn action(action: &str, text: impl Into<String>) -> Result<Self, PromptError> {
        Ok(PromptRequest::Action {
            action: ActionKind::parse(action)?,
            text: text.into(),
        })
    }

    pub fn document_summary(text: impl Into<String>) -> Self {
        PromptRequest::DocumentSummary { text: text.into() }
    }

    /// Fails fast on a template name outside `{formal_email, tweet_ideas}`.
    pub fn compose(template: &str, context: ComposeContext) -> Result<Self, PromptError> {
        Ok(PromptRequest::Compose {
            template: ComposeTemplate::parse(template)?,
            context,
        })
    }

    pub fn analyze(question: impl Into<String>, context: impl Into<String>) -> Self {
        PromptRequest::Analyze {
            question: question.into(),
            context: context.into(),
        }
    }

    /// `today` is passed in rather than read from the clock so the builder
    /// stays pure.
    pub fn create_event(text: impl Into<String>, today: NaiveDate) -> Self {
        PromptRequest::CreateEvent {
            text: text.into(),
            today,
        }
    }

    /// Renders the request into the single prompt string sent upstream.
    pub fn build(&self) -> String {
        match self {
            PromptRequest::Chat { message, context } => {
                let context = truncate_context(context.as_deref().unwrap_or(""));
                format!(
                    "You are Omni, a helpful AI assistant. Analyze the context from \
                     the user's webpage and answer their question.\n\n\
                     CONTEXT: \"\"\"{context}\"\"\"\n\n\
                     USER'S QUESTION: \"{message}\""
                )
            }
            PromptRequest::Action { action, text } => match action {
                ActionKind::Rephrase => format!(
                    "Rephrase the following text to be more clear and concise: \"{text}\""
                ),
                ActionKind::Summarize => format!(
                    "Summarize the following text in one key sentence: \"{text}\""
                ),
            },
            PromptRequest::DocumentSummary { text } => {
                let text = truncate_context(text);
                format!(
                    "Please provide a concise summary of the following document:\n\n\
                     DOCUMENT TEXT:\n\"\"\"\n{text}\n\"\"\"\n\n\
                     SUMMARY:"
                )
            }
            PromptRequest::Compose { template, context } => match template {
                ComposeTemplate::FormalEmail => {
                    let to = context.to.as_deref().unwrap_or("");
                    let subject = context.subject.as_deref().unwrap_or("");
                    let points = context.points.as_deref().unwrap_or("");
                    format!(
                        "Write a formal email with the following details:\n\
                         To: {to}\n\
                         From: A professional\n\
                         Subject: {subject}\n\n\
                         Key points to include:\n\
                         - {points}\n\n\
                         The tone should be professional, respectful, and clear."
                    )
                }
                ComposeTemplate::TweetIdeas => {
                    let topic = context.topic.as_deref().unwrap_or("");
                    format!(
                        "Generate 5 creative and engaging tweet ideas about the \
                         following topic: \"{topic}\".\n\
                         The tweets should be short, punchy, and include relevant hashtags."
                    )
                }
            },
            PromptRequest::Analyze { question, context } => {
                let context = truncate_context(context);
                format!(
                    "Analyze the following document context and answer the user's \
                     question.\n\n\
                     DOCUMENT CONTEXT:\n\"\"\"\n{context}\n\"\"\"\n\n\
                     USER'S QUESTION: \"{question}\"\n\n\
                     ANALYSIS:"
                )
            }
            PromptRequest::CreateEvent { text, today } => {
                let date = today.format("%B %-d, %Y");
                format!(
                    "From the following text, extract an event title and a start time \
                     in full ISO 8601 format (e.g., 2025-08-23T16:00:00+05:30).\n\
                     Today's date is {date}. The user is in Hyderabad, India \
                     (time zone Asia/Kolkata, UTC+05:30).\n\
                     If no time is specified, assume a reasonable time like 10:00 AM.\n\
                     Respond ONLY with a single JSON object containing \"title\" and \
                     \"startTime\".\n\n\
                     TEXT: \"{text}\""
                )
            }
        }
    }
}

/// Prefix take of at most `MAX_CONTEXT_CHARS` characters, respecting char
/// boundaries.
pub fn truncate_context(text: &str) -> &str {
    match text.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_prompt_is_exact() {
        let request = PromptRequest::action("summarize", "The quick brown fox...").unwrap();
        assert_eq!(
            request.build(),
            "Summarize the following text in one key sentence: \"The quick brown fox...\""
        );
    }

    #[test]
    fn test_rephrase_prompt_is_exact() {
        let request = PromptRequest::action("rephrase", "hello there").unwrap();
        assert_eq!(
            request.build(),
            "Rephrase the following text to be more clear and concise: \"hello there\""
        );
    }

    #[test]
    fn test_unknown_action_fails_before_building() {
        let result = PromptRequest::action("translate", "text");
        assert!(matches!(result, Err(PromptError::InvalidRequest(_))));
    }

    #[test]
    fn test_unknown_template_fails_before_building() {
        let result = PromptRequest::compose("haiku", ComposeContext::default());
        assert!(matches!(result, Err(PromptError::InvalidRequest(_))));
    }

    #[test]
    fn test_truncation_is_identity_below_limit() {
        let text = "a".repeat(MAX_CONTEXT_CHARS);
        assert_eq!(truncate_context(&text), text);
    }

    #[test]
    fn test_truncation_takes_exact_prefix_above_limit() {
        let text = "b".repeat(MAX_CONTEXT_CHARS + 17);
        let truncated = truncate_context(&text);
        assert_eq!(truncated.chars().count(), MAX_CONTEXT_CHARS);
        assert_eq!(truncated, &text[..MAX_CONTEXT_CHARS]);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_CONTEXT_CHARS + 1);
        let truncated = truncate_context(&text);
        assert_eq!(truncated.chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_chat_prompt_with_missing_context() {
        let prompt = PromptRequest::chat("What is this page?", None).build();
        assert!(prompt.contains("CONTEXT: \"\"\"\"\"\""));
        assert!(prompt.contains("USER'S QUESTION: \"What is this page?\""));
    }

    #[test]
    fn test_chat_prompt_truncates_long_context() {
        let context = "c".repeat(MAX_CONTEXT_CHARS + 100);
        let prompt = PromptRequest::chat("q", Some(context)).build();
        // The untruncated tail must not appear.
        assert!(!prompt.contains(&"c".repeat(MAX_CONTEXT_CHARS + 1)));
        assert!(prompt.contains(&"c".repeat(MAX_CONTEXT_CHARS)));
    }

    #[test]
    fn test_compose_formal_email_fills_fields() {
        let context = ComposeContext {
            to: Some("a@b.com".to_string()),
            subject: Some("Meeting".to_string()),
            points: Some("reschedule to Friday".to_string()),
            topic: None,
        };
        let prompt = PromptRequest::compose("formal_email", context)
            .unwrap()
            .build();
        assert!(prompt.contains("To: a@b.com"));
        assert!(prompt.contains("Subject: Meeting"));
        assert!(prompt.contains("- reschedule to Friday"));
    }

    #[test]
    fn test_compose_missing_fields_render_empty() {
        let prompt = PromptRequest::compose("tweet_ideas", ComposeContext::default())
            .unwrap()
            .build();
        assert!(prompt.contains("following topic: \"\"."));
    }

    #[test]
    fn test_create_event_prompt_embeds_date_and_timezone() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 23).unwrap();
        let prompt = PromptRequest::create_event("Meet John tomorrow at 3pm", today).build();
        assert!(prompt.contains("Today's date is August 23, 2025."));
        assert!(prompt.contains("Asia/Kolkata"));
        assert!(prompt.contains("TEXT: \"Meet John tomorrow at 3pm\""));
    }
}

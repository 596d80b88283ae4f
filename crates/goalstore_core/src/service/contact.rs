//! Contact form intake.
//!
//! # Responsibility
//! - Sanitize and validate a submitted contact form.
//! - Compose the outbound notification and hand it to a `MailSender`.
//!
//! # Invariants
//! - Invalid input never reaches the sender.
//! - Submitted content is never logged; only lengths are.

use crate::config::ContactConfig;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const EMAIL_MAX_CHARS: usize = 50;
pub const SUBJECT_MAX_CHARS: usize = 100;
pub const MESSAGE_MAX_CHARS: usize = 3000;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}").expect("valid email regex")
});

/// Raw submission. Missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ContactForm {
    pub fn from_json(body: &str) -> Result<Self, ContactError> {
        serde_json::from_str(body).map_err(|_| ContactError::MalformedPayload)
    }
}

/// Sanitized, validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Plain-text email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailError {
    pub message: String,
}

impl MailError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "mail delivery failed: {}", self.message)
    }
}

impl Error for MailError {}

/// Delivery channel for outbound email.
pub trait MailSender {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

impl<T: MailSender + ?Sized> MailSender for &T {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        (**self).send(email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// Body is not a JSON object with the expected fields.
    MalformedPayload,
    /// Email, subject or message failed validation.
    InvalidInput,
    Send(MailError),
}

impl Display for ContactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload => f.write_str("malformed contact payload"),
            Self::InvalidInput => f.write_str("invalid input"),
            Self::Send(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContactError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Send(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MailError> for ContactError {
    fn from(value: MailError) -> Self {
        Self::Send(value)
    }
}

/// Trims, drops control characters (tab, LF and CR survive) and caps the
/// result at `max_chars` characters.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    text.trim()
        .chars()
        .filter(|ch| !is_stripped_control(*ch))
        .take(max_chars)
        .collect()
}

fn is_stripped_control(ch: char) -> bool {
    matches!(ch, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}')
}

/// Sanitizes every field and checks the result.
pub fn validate_contact(form: &ContactForm) -> Result<ContactMessage, ContactError> {
    let field = |value: &Option<String>, cap| sanitize(value.as_deref().unwrap_or_default(), cap);
    let email = field(&form.email, EMAIL_MAX_CHARS);
    let subject = field(&form.subject, SUBJECT_MAX_CHARS);
    let message = field(&form.message, MESSAGE_MAX_CHARS);

    if !EMAIL_RE.is_match(&email) || subject.is_empty() || message.is_empty() {
        return Err(ContactError::InvalidInput);
    }
    Ok(ContactMessage {
        email,
        subject,
        message,
    })
}

/// Builds the notification for the site owner.
pub fn compose_email(config: &ContactConfig, message: &ContactMessage) -> OutboundEmail {
    OutboundEmail {
        from: config.sender.clone(),
        to: config.recipient.clone(),
        reply_to: message.email.clone(),
        subject: format!("[Contact] {}", message.subject),
        body: format!(
            "New contact form submission\n\nEmail: {}\nSubject: {}\n\nMessage:\n{}\n",
            message.email, message.subject, message.message
        ),
    }
}

pub struct ContactService<M> {
    sender: M,
    config: ContactConfig,
}

impl<M: MailSender> ContactService<M> {
    pub fn new(sender: M, config: ContactConfig) -> Self {
        Self { sender, config }
    }

    pub fn submit(&self, form: &ContactForm) -> Result<(), ContactError> {
        let message = validate_contact(form).map_err(|err| {
            info!("event=contact_submit module=contact status=rejected");
            err
        })?;
        let email = compose_email(&self.config, &message);
        match self.sender.send(&email) {
            Ok(()) => {
                info!(
                    "event=contact_submit module=contact status=ok message_chars={}",
                    message.message.chars().count()
                );
                Ok(())
            }
            Err(err) => {
                warn!("event=contact_submit module=contact status=send_failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize;

    #[test]
    fn sanitize_strips_controls_but_keeps_line_breaks() {
        assert_eq!(sanitize("  a\u{0}b\tc\nd\u{1F}  ", 100), "ab\tc\nd");
    }

    #[test]
    fn sanitize_caps_by_characters() {
        assert_eq!(sanitize("ééééé", 3), "ééé");
    }
}

//! Best-effort assignment emails.
//!
//! Notification never blocks an assignment: every failure is turned into a
//! [`NotifyOutcome`] label stored in the assignment log.

pub mod email;

pub use email::{DisabledNotifier, SmtpNotifier};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::NotifyError;

/// An assignment email, rendered from a fixed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentEmail {
    pub to: String,
    pub volunteer_name: String,
    pub task_name: String,
    pub reasoning: String,
}

impl AssignmentEmail {
    pub fn subject(&self) -> String {
        format!("🎉 You're Selected! Assignment: {}", self.task_name)
    }

    pub fn html_body(&self) -> String {
        format!(
            "<h3>Hi {name},</h3>\n\
             <p>We are excited to tell you that based on your skills, you have been selected for the <strong>{task}</strong> team.</p>\n\
             <p><strong>Why you?</strong> {reason}</p>\n\
             <br>\n\
             <p>Please reply to this email to confirm your slot.</p>\n\
             <p><em>- The Event Team</em></p>\n",
            name = escape_html(&self.volunteer_name),
            task = escape_html(&self.task_name),
            reason = escape_html(&self.reasoning),
        )
    }
}

/// What a transport did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

/// Outcome recorded in the assignment log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Skipped,
    Failed(String),
}

impl NotifyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            NotifyOutcome::Sent => "Email Sent ✅",
            NotifyOutcome::Skipped => "Email Skipped",
            NotifyOutcome::Failed(_) => "Email Failed ❌",
        }
    }
}

/// Email transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, email: &AssignmentEmail) -> Result<Delivery, NotifyError>;
}

/// Send an assignment email unless the address is blank or a placeholder.
pub async fn notify_volunteer(
    notifier: &dyn Notifier,
    email: &AssignmentEmail,
    placeholder_domain: &str,
) -> NotifyOutcome {
    let address = email.to.trim();
    if address.is_empty() || (!placeholder_domain.is_empty() && address.contains(placeholder_domain)) {
        debug!(to = %address, "Skipping email for placeholder address");
        return NotifyOutcome::Skipped;
    }

    match notifier.send(email).await {
        Ok(Delivery::Sent) => NotifyOutcome::Sent,
        Ok(Delivery::Skipped) => NotifyOutcome::Skipped,
        Err(e) => {
            warn!(to = %address, notifier = notifier.name(), error = %e, "Email failed");
            NotifyOutcome::Failed(e.to_string())
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

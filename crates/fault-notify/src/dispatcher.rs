//! Notification Dispatcher

use crate::error::DeliveryError;
use crate::Notifier;
use alerting::{Fault, FaultEvent, Transition};
use fault_source::cause::THRESHOLD_CROSSED;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How notifications are worded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFormat {
    /// Name of the monitored system, first word of every subject
    pub source_label: String,
    /// Cause being monitored
    pub cause: String,
    /// Management console link included in the body
    pub console_url: Option<String>,
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self {
            source_label: "UCS".to_string(),
            cause: THRESHOLD_CROSSED.to_string(),
            console_url: None,
        }
    }
}

/// Turns fault transitions into messages for a [`Notifier`]
pub struct NotificationDispatcher {
    notifier: Box<dyn Notifier>,
    format: MessageFormat,
}

impl NotificationDispatcher {
    pub fn new(notifier: Box<dyn Notifier>, format: MessageFormat) -> Self {
        Self { notifier, format }
    }

    /// `<label> - <cause> - <Raised|Recovered>: <id> - <dn>`
    pub fn subject(&self, fault: &Fault, transition: Transition) -> String {
        format!(
            "{} - {} - {}: {} - {}",
            self.format.source_label,
            self.format.cause,
            transition.label(),
            fault.id(),
            fault.distinguished_name()
        )
    }

    /// HTML body carrying the full fault description
    pub fn body(&self, fault: &Fault, transition: Transition) -> String {
        let mut body = format!("<h3>{}</h3>", escape_html(&self.subject(fault, transition)));
        if let Some(url) = &self.format.console_url {
            body.push_str(&format!(
                "<a href='{}'>Check here to go to the management console!</a>",
                escape_html(url)
            ));
        }
        body.push_str(&format!("<pre>{}</pre></br>", escape_html(fault.description())));
        body
    }

    /// Format and deliver one notification
    pub async fn notify(&self, fault: &Fault, transition: Transition) -> Result<(), DeliveryError> {
        let subject = self.subject(fault, transition);
        let body = self.body(fault, transition);
        debug!(id = %fault.id(), severity = %fault.severity(), "Dispatching notification");
        self.notifier.send(&subject, &body).await
    }

    /// Deliver every event in order.
    ///
    /// A failed delivery is logged and does not stop the remaining events.
    /// Returns the number of failed deliveries.
    pub async fn dispatch_all(&self, events: &[FaultEvent]) -> usize {
        let mut failures = 0;
        for event in events {
            if let Err(e) = self.notify(&event.fault, event.transition).await {
                failures += 1;
                warn!(
                    id = %event.fault.id(),
                    transition = %event.transition,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
        failures
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
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

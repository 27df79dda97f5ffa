use std::time::Duration;

use serde::Deserialize;
use tally_core::format::format_number;
use tally_core::Reminder;
use tally_store::ProcessKey;

// ── Config ──

/// Notification channel configuration, stored in `config.json` under key `notify_channels`.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum Channel {
    #[serde(rename = "ntfy")]
    Ntfy { url: String, events: Vec<String> },
    #[serde(rename = "webhook")]
    Webhook { url: String, events: Vec<String> },
    #[serde(rename = "telegram")]
    Telegram {
        bot_token: String,
        chat_id: String,
        events: Vec<String>,
    },
}

impl Channel {
    pub fn events(&self) -> &[String] {
        match self {
            Channel::Ntfy { events, .. } => events,
            Channel::Webhook { events, .. } => events,
            Channel::Telegram { events, .. } => events,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Channel::Ntfy { url, .. } => format!("ntfy({})", url),
            Channel::Webhook { url, .. } => format!("webhook({})", url),
            Channel::Telegram { chat_id, .. } => format!("telegram(chat:{})", chat_id),
        }
    }

    fn matches(&self, event: &NotifyEvent) -> bool {
        let name = event.event_name();
        self.events().iter().any(|e| e == name || e == "*")
    }
}

/// Top-level notify configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NotifyConfig {
    pub channels: Vec<Channel>,
}

impl NotifyConfig {
    /// Load from `config.json` key `notify_channels`.
    /// Returns empty config if key is missing or unparseable.
    pub fn load(paths: &tally_store::TallyPaths) -> Self {
        let content = match std::fs::read_to_string(&paths.config_json) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        let val: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "config.json is not valid JSON, notifications disabled");
                return Self::default();
            }
        };
        let channels_val = match val.get("notify_channels") {
            Some(v) => v.clone(),
            None => return Self::default(),
        };
        match serde_json::from_value(channels_val) {
            Ok(channels) => Self { channels },
            Err(e) => {
                tracing::warn!(error = %e, "invalid notify_channels, notifications disabled");
                Self::default()
            }
        }
    }
}

// ── Notification Events ──

/// Outbound events raised by threshold crossings.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    ChangeReminder {
        device_id: String,
        process_type: String,
        total: f64,
        target: f64,
    },
    ForcedChange {
        device_id: String,
        process_type: String,
        total: f64,
        upper_limit: f64,
    },
}

impl NotifyEvent {
    /// Map a reminder to an outbound event. A pending notice was already
    /// announced when the band was entered, so it maps to nothing.
    pub fn from_reminder(key: &ProcessKey, reminder: &Reminder) -> Option<Self> {
        let device_id = key.device_id().to_string();
        let process_type = key.process_type().to_string();
        match *reminder {
            Reminder::Forced { total, upper_limit } => Some(NotifyEvent::ForcedChange {
                device_id,
                process_type,
                total,
                upper_limit,
            }),
            Reminder::Reached { total, target } => Some(NotifyEvent::ChangeReminder {
                device_id,
                process_type,
                total,
                target,
            }),
            Reminder::Pending { .. } => None,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            NotifyEvent::ChangeReminder { .. } => "change_reminder",
            NotifyEvent::ForcedChange { .. } => "forced_change",
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            NotifyEvent::ChangeReminder {
                device_id,
                process_type,
                total,
                target,
            } => serde_json::json!({
                "device_id": device_id,
                "process_type": process_type,
                "total": total,
                "target": target,
            }),
            NotifyEvent::ForcedChange {
                device_id,
                process_type,
                total,
                upper_limit,
            } => serde_json::json!({
                "device_id": device_id,
                "process_type": process_type,
                "total": total,
                "upper_limit": upper_limit,
            }),
        }
    }
}

// ── Dispatch ──

const TIMEOUT: Duration = Duration::from_secs(5);

/// Send notifications to all channels matching this event.
/// Errors are logged but never propagated.
pub fn dispatch(config: &NotifyConfig, event: &NotifyEvent) {
    for channel in &config.channels {
        if !channel.matches(event) {
            continue;
        }
        let name = channel.display_name();
        if let Err(e) = send(channel, event) {
            tracing::warn!(channel = %name, error = %e, "notification failed");
        }
    }
}

/// Send a test notification to all configured channels.
/// Returns per-channel results for CLI display.
pub fn test_channels(config: &NotifyConfig) -> Vec<(String, Result<(), String>)> {
    let test_event = NotifyEvent::ChangeReminder {
        device_id: "test".to_string(),
        process_type: "test".to_string(),
        total: 0.0,
        target: 0.0,
    };
    config
        .channels
        .iter()
        .map(|ch| {
            let name = ch.display_name();
            let result = send(ch, &test_event).map_err(|e| e.to_string());
            (name, result)
        })
        .collect()
}

fn send(channel: &Channel, event: &NotifyEvent) -> anyhow::Result<()> {
    match channel {
        Channel::Ntfy { url, .. } => send_ntfy(url, event),
        Channel::Webhook { url, .. } => send_webhook(url, event),
        Channel::Telegram {
            bot_token, chat_id, ..
        } => send_telegram(bot_token, chat_id, event),
    }
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(TIMEOUT))
        .build()
        .new_agent()
}

// ── ntfy ──

fn send_ntfy(url: &str, event: &NotifyEvent) -> anyhow::Result<()> {
    let (title, body, priority) = format_ntfy(event);
    agent()
        .post(url)
        .header("Title", &title)
        .header("Priority", &priority)
        .send(&body)?;
    Ok(())
}

fn format_ntfy(event: &NotifyEvent) -> (String, String, String) {
    match event {
        NotifyEvent::ChangeReminder {
            device_id,
            process_type,
            total,
            target,
        } => (
            format!("Change due: {device_id}/{process_type}"),
            format!(
                "Total {} has reached the change band (target {})",
                format_number(*total),
                format_number(*target)
            ),
            "high".to_string(),
        ),
        NotifyEvent::ForcedChange {
            device_id,
            process_type,
            total,
            upper_limit,
        } => (
            format!("Change now: {device_id}/{process_type}"),
            format!(
                "Total {} is above the upper limit {}",
                format_number(*total),
                format_number(*upper_limit)
            ),
            "urgent".to_string(),
        ),
    }
}

// ── Webhook (generic JSON POST) ──

fn send_webhook(url: &str, event: &NotifyEvent) -> anyhow::Result<()> {
    let payload = format_webhook(event);
    agent()
        .post(url)
        .header("Content-Type", "application/json")
        .send(payload.to_string())?;
    Ok(())
}

fn format_webhook(event: &NotifyEvent) -> serde_json::Value {
    serde_json::json!({
        "event_type": event.event_name(),
        "data": event.to_json(),
    })
}

// ── Telegram ──

fn send_telegram(bot_token: &str, chat_id: &str, event: &NotifyEvent) -> anyhow::Result<()> {
    let text = format_telegram(event);
    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "Markdown",
    });
    agent()
        .post(&url)
        .header("Content-Type", "application/json")
        .send(body.to_string())?;
    Ok(())
}

fn format_telegram(event: &NotifyEvent) -> String {
    match event {
        NotifyEvent::ChangeReminder {
            device_id,
            process_type,
            total,
            target,
        } => format!(
            "*Change due*\n`{device_id}/{process_type}` at {} (target {})",
            format_number(*total),
            format_number(*target)
        ),
        NotifyEvent::ForcedChange {
            device_id,
            process_type,
            total,
            upper_limit,
        } => format!(
            "*Change now*\n`{device_id}/{process_type}` at {} exceeds {}",
            format_number(*total),
            format_number(*upper_limit)
        ),
    }
}

// ── Tests ──

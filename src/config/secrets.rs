// src/config/secrets.rs
use std::fmt;

/// API key or token. `Debug`/`Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// `None` for empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(len={})", self.0.len())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

pub const ENV_SERPER_API_KEY: &str = "SERPER_API_KEY";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub bot_token: Secret,
    pub chat_id: String,
}

/// Lookup a secret through `lookup` (normally `std::env::var`).
pub fn lookup_secret<F>(lookup: &F, name: &str) -> Option<Secret>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(Secret::new)
}

pub fn telegram_from<F>(lookup: &F) -> Option<TelegramCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let bot_token = lookup_secret(lookup, ENV_TELEGRAM_BOT_TOKEN)?;
    let chat_id = lookup(ENV_TELEGRAM_CHAT_ID)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;
    Some(TelegramCredentials { bot_token, chat_id })
}

pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

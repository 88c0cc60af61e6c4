use std::path::Path;

use anyhow::anyhow;
use chrono_tz::Tz;
use serde::Deserialize;
use tokio::fs::read_to_string;

use crate::{phone::Ruleset, registry::RegistryOptions};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    admin: Vec<i64>,
    #[serde(default)]
    telegram: Telegram,
    #[serde(default)]
    http: Http,
    #[serde(default)]
    registry: Registry,
    #[serde(default)]
    privacy: Privacy,
    #[serde(default)]
    maintenance: Maintenance,
    #[serde(default)]
    supervisor: Supervisor,
}

impl Config {
    pub fn telegram(&self) -> &Telegram {
        &self.telegram
    }

    pub fn admin(&self) -> &[i64] {
        &self.admin
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn privacy(&self) -> &Privacy {
        &self.privacy
    }

    pub fn maintenance(&self) -> &Maintenance {
        &self.maintenance
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Read `file` if present, apply environment overrides and validate.
    pub async fn read(file: &str) -> anyhow::Result<Self> {
        let config = if Path::new(file).exists() {
            let content = read_to_string(file).await?;
            toml::from_str(&content)?
        } else {
            log::warn!("Configure file {file:?} not found, using defaults");
            Self::default()
        };
        config
            .with_env(|key| std::env::var(key).ok())
            .validate()
    }

    fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        };

        if let Some(token) = first(&["BOT_TOKEN", "TELEGRAM_BOT_TOKEN"]) {
            self.telegram.api_key = token;
        }
        if let Some(url) = first(&["WEBHOOK_URL", "RENDER_EXTERNAL_URL"]) {
            let webhook = self.telegram.webhook.get_or_insert_with(Default::default);
            webhook.url = url;
        }
        // A single exposed port goes to the webhook listener when there is one.
        if let Some(port) = first(&["PORT"]) {
            let listen = format!("0.0.0.0:{}", port.trim());
            match self.telegram.webhook.as_mut() {
                Some(webhook) => webhook.listen = listen,
                None => self.http.listen = Some(listen),
            }
        }
        self
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.telegram.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Telegram bot token is missing, set telegram.api-key or BOT_TOKEN"
            ));
        }
        self.registry.timezone()?;
        if let Some(webhook) = &self.telegram.webhook {
            webhook.url.parse::<reqwest::Url>()?;
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Telegram {
    #[serde(alias = "server", alias = "api-server")]
    api_server: Option<String>,
    #[serde(default, alias = "key", alias = "api-key", alias = "api")]
    api_key: String,
    webhook: Option<Webhook>,
}

impl Telegram {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_server(&self) -> Option<&String> {
        self.api_server.as_ref()
    }

    pub fn webhook(&self) -> Option<&Webhook> {
        self.webhook.as_ref()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Webhook {
    #[serde(default)]
    url: String,
    #[serde(default = "default_webhook_listen")]
    listen: String,
}

impl Default for Webhook {
    fn default() -> Self {
        Self {
            url: String::new(),
            listen: default_webhook_listen(),
        }
    }
}

fn default_webhook_listen() -> String {
    "0.0.0.0:8443".to_string()
}

impl Webhook {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn listen(&self) -> &str {
        &self.listen
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Http {
    listen: Option<String>,
}

impl Http {
    pub fn listen(&self) -> Option<&String> {
        self.listen.as_ref()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Registry {
    ruleset: Ruleset,
    #[serde(alias = "max-records")]
    max_records: usize,
    #[serde(alias = "max-users")]
    max_users: usize,
    #[serde(alias = "retention-days")]
    retention_days: u64,
    #[serde(alias = "history-size")]
    history_size: usize,
    #[serde(alias = "rate-limit")]
    rate_limit: usize,
    database: Option<String>,
    timezone: String,
}

impl Default for Registry {
    fn default() -> Self {
        let options = RegistryOptions::default();
        Self {
            ruleset: Ruleset::default(),
            max_records: options.max_records,
            max_users: options.max_users,
            retention_days: options.retention_days,
            history_size: options.history_size,
            rate_limit: options.rate_limit,
            database: None,
            timezone: options.timezone.name().to_string(),
        }
    }
}

impl Registry {
    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| anyhow!("Invalid timezone {:?}: {e}", self.timezone))
    }

    pub fn options(&self) -> anyhow::Result<RegistryOptions> {
        Ok(RegistryOptions {
            max_records: self.max_records.max(1),
            max_users: self.max_users.max(1),
            retention_days: self.retention_days,
            history_size: self.history_size,
            rate_limit: self.rate_limit,
            timezone: self.timezone()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Privacy {
    #[serde(default)]
    redact: bool,
}

impl Privacy {
    pub fn redact(&self) -> bool {
        self.redact
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Maintenance {
    heartbeat: u64,
    cleanup: u64,
}

impl Default for Maintenance {
    fn default() -> Self {
        Self {
            heartbeat: 300,
            cleanup: 3600,
        }
    }
}

impl Maintenance {
    pub fn heartbeat(&self) -> u64 {
        self.heartbeat
    }

    pub fn cleanup(&self) -> u64 {
        self.cleanup
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Supervisor {
    #[serde(alias = "max-restarts")]
    max_restarts: u32,
    #[serde(alias = "max-consecutive-failures")]
    max_consecutive_failures: u32,
    #[serde(alias = "base-delay")]
    base_delay: u64,
    #[serde(alias = "max-delay")]
    max_delay: u64,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            max_restarts: 20,
            max_consecutive_failures: 5,
            base_delay: 3,
            max_delay: 60,
        }
    }
}

impl Supervisor {
    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    pub fn base_delay(&self) -> u64 {
        self.base_delay
    }

    pub fn max_delay(&self) -> u64 {
        self.max_delay
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    const SAMPLE: &str = r#"
admin = [1000]

[telegram]
api-key = "123:abc"

[telegram.webhook]
url = "https://bot.example.com/webhook"

[registry]
ruleset = "malaysia"
max-records = 500
rate-limit = 0
database = "phones.db"

[privacy]
redact = true

[supervisor]
max-restarts = 3
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let config = config.with_env(env(&[])).validate().unwrap();
        assert_eq!(config.admin(), &[1000]);
        assert_eq!(config.telegram().api_key(), "123:abc");
        assert_eq!(
            config.telegram().webhook().unwrap().listen(),
            "0.0.0.0:8443"
        );
        assert_eq!(config.registry().ruleset(), Ruleset::Malaysia);
        assert_eq!(config.registry().database(), Some("phones.db"));
        let options = config.registry().options().unwrap();
        assert_eq!(options.max_records, 500);
        assert_eq!(options.max_users, 5000);
        assert_eq!(options.rate_limit, 0);
        assert!(config.privacy().redact());
        assert_eq!(config.supervisor().max_restarts(), 3);
        assert_eq!(config.supervisor().base_delay(), 3);
        assert_eq!(config.maintenance().heartbeat(), 300);
    }

    #[test]
    fn test_env_override() {
        let config = Config::default()
            .with_env(env(&[
                ("TELEGRAM_BOT_TOKEN", "42:xyz"),
                ("PORT", "10000"),
                ("RENDER_EXTERNAL_URL", "https://example.onrender.com"),
            ]))
            .validate()
            .unwrap();
        assert_eq!(config.telegram().api_key(), "42:xyz");
        assert!(config.http().listen().is_none());
        let webhook = config.telegram().webhook().unwrap();
        assert_eq!(webhook.url(), "https://example.onrender.com");
        assert_eq!(webhook.listen(), "0.0.0.0:10000");
        assert_eq!(config.registry().ruleset(), Ruleset::International);
    }

    #[test]
    fn test_port_without_webhook() {
        let config = Config::default().with_env(env(&[("BOT_TOKEN", "1:a"), ("PORT", "8080")]));
        assert_eq!(config.http().listen().unwrap(), "0.0.0.0:8080");
        assert!(config.telegram().webhook().is_none());
    }

    #[test]
    fn test_bot_token_precedence() {
        let config = Config::default().with_env(env(&[
            ("BOT_TOKEN", "first"),
            ("TELEGRAM_BOT_TOKEN", "second"),
        ]));
        assert_eq!(config.telegram().api_key(), "first");
    }

    #[test]
    fn test_missing_token() {
        assert!(Config::default().with_env(env(&[])).validate().is_err());

        let config: Config = toml::from_str(
            "[telegram]\nkey = \"1:a\"\n[registry]\ntimezone = \"Mars/Base\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}

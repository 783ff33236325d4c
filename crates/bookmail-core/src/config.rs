//! Layered settings: built-in defaults, `config/default`, `config/<RUN_MODE>`,
//! `config/local`, then `BOOKMAIL__SECTION__KEY` environment variables.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mail: MailSettings,
    pub worker: WorkerSettings,
    pub schedule: ScheduleSettings,
    pub queue: QueueSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub default_from_address: String,
    pub template_root: String,
    /// No relay configured means messages go to the log.
    pub smtp: Option<SmtpSettings>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            default_from_address: "noreply@yourdomain.com".to_string(),
            template_root: "templates".to_string(),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tls: TlsMode,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub concurrency: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub pending_sweep_every_secs: u64,
    pub upcoming_sweep_every_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            pending_sweep_every_secs: 3600,
            upcoming_sweep_every_secs: 86_400,
        }
    }
}

impl ScheduleSettings {
    pub fn pending_sweep_every(&self) -> Duration {
        Duration::from_secs(self.pending_sweep_every_secs)
    }

    pub fn upcoming_sweep_every(&self) -> Duration {
        Duration::from_secs(self.upcoming_sweep_every_secs)
    }
}

/// How much finished work a long-running process keeps in memory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Finished tasks kept for inspection; older ones are dropped together
    /// with their attempt and decision history.
    pub retain_finished: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            retain_finished: 1000,
        }
    }
}

/// What the notification tasks need from the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub default_from_address: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        MailSettings::default().notification()
    }
}

impl MailSettings {
    pub fn notification(&self) -> NotificationConfig {
        NotificationConfig {
            default_from_address: self.default_from_address.clone(),
        }
    }
}

impl Settings {
    /// Load `default`, `<run_mode>` and `local` from `config_dir`, then the
    /// environment.
    pub fn load_from(config_dir: &str, run_mode: &str) -> Result<Self, config::ConfigError> {
        let file = |name: &str| config::File::with_name(&format!("{config_dir}/{name}"));
        let cfg = config::Config::builder()
            .add_source(file("default").required(false))
            .add_source(file(run_mode).required(false))
            .add_source(file("local").required(false))
            .add_source(
                config::Environment::with_prefix("BOOKMAIL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: config::Config) -> Result<Self, config::ConfigError> {
        cfg.try_deserialize()
    }

    pub fn notification(&self) -> NotificationConfig {
        self.mail.notification()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn from_toml(src: &str) -> Result<Settings, config::ConfigError> {
        Settings::from_config(
            Config::builder()
                .add_source(File::from_str(src, FileFormat::Toml))
                .build()?,
        )
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings = Settings::from_config(Config::builder().build().unwrap()).unwrap();
        assert_eq!(settings.mail.default_from_address, "noreply@yourdomain.com");
        assert_eq!(settings.mail.template_root, "templates");
        assert!(settings.mail.smtp.is_none());
        assert_eq!(settings.worker.concurrency, 4);
        assert_eq!(settings.schedule.pending_sweep_every(), Duration::from_secs(3600));
        assert_eq!(settings.schedule.upcoming_sweep_every(), Duration::from_secs(86_400));
        assert_eq!(settings.queue.retain_finished, 1000);
    }

    #[test]
    fn file_overrides_merge_with_defaults() {
        let settings = from_toml(
            r#"
            [mail]
            default_from_address = "bookings@example.com"

            [mail.smtp]
            host = "smtp.example.com"
            tls = "tls"

            [worker]
            concurrency = 8

            [queue]
            retain_finished = 50
            "#,
        )
        .unwrap();

        assert_eq!(settings.notification().default_from_address, "bookings@example.com");
        assert_eq!(settings.mail.template_root, "templates");
        let smtp = settings.mail.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.tls, TlsMode::Tls);
        assert_eq!(settings.worker.concurrency, 8);
        assert_eq!(settings.queue.retain_finished, 50);
    }

    #[test]
    fn unknown_tls_mode_is_rejected() {
        let err = from_toml(
            r#"
            [mail.smtp]
            host = "smtp.example.com"
            tls = "ssl3"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_config_dir_falls_back_to_defaults() {
        let settings = Settings::load_from("/nonexistent/bookmail", "test").unwrap();
        assert_eq!(settings.mail.template_root, "templates");
    }
}

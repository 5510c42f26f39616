//! Application configuration. ConfigView dot-path lookup over the YAML tree,
//! plus the typed AppConfig resolved once at startup.
//!
//! Components receive typed AppConfig fields; the raw view stays around only
//! for optional utility keys (e.g. the sessiongen-only `telegram.*` entries).

use crate::domain::DomainError;
use config::{Config, File, FileFormat, Map, Source, Value, ValueKind};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Default prefix for the time-sharded archive indices; queries target
/// `{prefix}*`.
pub const DEFAULT_INDEX_PREFIX: &str = "telegram";

/// Default search backend base URL.
pub const DEFAULT_SEARCH_HOST: &str = "http://localhost:9200";

/// Default bound on a single search call, in milliseconds.
const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 10_000;

/// Default idle window that marks the end of the replayed connection
/// backlog, in milliseconds.
const DEFAULT_CATCH_UP_GRACE_MS: u64 = 1_000;

/// Read-only accessor over a loaded configuration tree.
///
/// Paths are dot-separated key sequences (`elasticsearch.index.prefix`).
/// A present-but-null leaf counts as absent, so a config file can explicitly
/// "unset" a defaulted option. A present leaf of the wrong type is an error,
/// never a silent default.
#[derive(Debug, Clone)]
pub struct ConfigView {
    root: Map<String, Value>,
}

impl ConfigView {
    /// Load and parse the config file at `path` as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let root = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Yaml))
            .build()
            .map_err(|e| {
                DomainError::Config(format!(
                    "unable to parse config file '{}': {}",
                    path.display(),
                    e
                ))
            })?
            .collect()
            .map_err(|e| DomainError::Config(e.to_string()))?;
        Ok(Self { root })
    }

    /// Build a view from an in-memory YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, DomainError> {
        let root = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .map_err(|e| DomainError::Config(e.to_string()))?
            .collect()
            .map_err(|e| DomainError::Config(e.to_string()))?;
        Ok(Self { root })
    }

    /// Required lookup. Fails with [`DomainError::MissingConfigKey`] naming
    /// the full dotted path when any segment is absent or the leaf is null.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        match self.resolve(path) {
            Some(value) => self.deserialize(path, value),
            None => Err(DomainError::MissingConfigKey {
                path: path.to_string(),
            }),
        }
    }

    /// Lookup with a fallback. Absent paths and null leaves yield `default`.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> Result<T, DomainError> {
        match self.resolve(path) {
            Some(value) => self.deserialize(path, value),
            None => Ok(default),
        }
    }

    /// Optional lookup. Absent paths and null leaves yield `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, DomainError> {
        match self.resolve(path) {
            Some(value) => self.deserialize(path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Walk the dotted path through nested tables. `None` when a segment is
    /// missing, an intermediate value is not a table, or the leaf is null.
    fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.root.get(segments.next()?)?;
        for segment in segments {
            match &value.kind {
                ValueKind::Table(table) => value = table.get(segment)?,
                _ => return None,
            }
        }
        match value.kind {
            ValueKind::Nil => None,
            _ => Some(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        path: &str,
        value: &Value,
    ) -> Result<T, DomainError> {
        value
            .clone()
            .try_deserialize()
            .map_err(|e| DomainError::Config(format!("config option {}: {}", path, e)))
    }
}

/// Typed configuration schema, validated once at load time.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub bot: BotConfig,
    pub search: SearchConfig,
}

/// Telegram API credentials (from https://my.telegram.org).
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_id: i32,
    pub api_hash: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Session storage for the bot account; `~` expands to the home
    /// directory.
    pub session_file: PathBuf,
    /// Usernames denied access. Senders with no username never match and
    /// are allowed (fail-open).
    pub banned_users: Vec<String>,
    /// Idle window marking the end of the replayed connection backlog.
    pub catch_up_grace_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Base URL of the search backend.
    pub host: String,
    /// Prefix of the archive indices; queries target `{prefix}*`.
    pub index_prefix: String,
    /// Bound on a single search call.
    pub request_timeout_ms: u64,
}

impl AppConfig {
    /// Resolve the bot process configuration from a loaded view. Missing
    /// required keys surface as [`DomainError::MissingConfigKey`] and are
    /// fatal at startup.
    pub fn from_view(view: &ConfigView) -> Result<Self, DomainError> {
        Ok(Self {
            telegram: TelegramConfig {
                api_id: view.get("telegram.api_id")?,
                api_hash: view.get("telegram.api_hash")?,
            },
            bot: BotConfig {
                token: view.get("telegram-bot.bot_token")?,
                session_file: expand_user(&view.get::<String>("telegram-bot.bot_session_file")?),
                banned_users: view.get_or("telegram-bot.banned_users", Vec::new())?,
                catch_up_grace_ms: view
                    .get_or("telegram-bot.catch_up_grace_ms", DEFAULT_CATCH_UP_GRACE_MS)?,
            },
            search: SearchConfig {
                host: view.get_or("elasticsearch.host", DEFAULT_SEARCH_HOST.to_string())?,
                index_prefix: view
                    .get_or("elasticsearch.index.prefix", DEFAULT_INDEX_PREFIX.to_string())?,
                request_timeout_ms: view
                    .get_or("elasticsearch.request_timeout_ms", DEFAULT_SEARCH_TIMEOUT_MS)?,
            },
        })
    }
}

/// Expand a leading `~` to the home directory. Foreign-user forms
/// (`~alice/...`) are returned unchanged.
pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
telegram:
  api_id: 12345
  api_hash: "0123456789abcdef"
telegram-bot:
  bot_token: "110201543:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"
  bot_session_file: "bot.session"
  banned_users:
    - spammer
    - flooder
elasticsearch:
  host: "http://search:9200"
"#;

    fn sample_view() -> ConfigView {
        ConfigView::from_yaml(SAMPLE).unwrap()
    }

    #[test]
    fn test_get_returns_present_leaf() {
        let view = sample_view();
        assert_eq!(view.get::<i32>("telegram.api_id").unwrap(), 12345);
        assert_eq!(
            view.get::<String>("elasticsearch.host").unwrap(),
            "http://search:9200"
        );
    }

    #[test]
    fn test_get_missing_path_fails_with_full_path() {
        let view = sample_view();
        let err = view.get::<String>("telegram.phone_number").unwrap_err();
        match err {
            DomainError::MissingConfigKey { path } => {
                assert_eq!(path, "telegram.phone_number");
            }
            other => panic!("expected MissingConfigKey, got {other:?}"),
        }
    }

    #[test]
    fn test_get_or_missing_path_yields_default() {
        let view = sample_view();
        let prefix = view
            .get_or("elasticsearch.index.prefix", "telegram".to_string())
            .unwrap();
        assert_eq!(prefix, "telegram");
    }

    #[test]
    fn test_get_opt_missing_path_yields_none() {
        let view = sample_view();
        let value = view.get_opt::<u64>("elasticsearch.request_timeout_ms").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_null_leaf_counts_as_absent() {
        let view = ConfigView::from_yaml("telegram-bot:\n  banned_users:\n").unwrap();
        let banned = view
            .get_or::<Vec<String>>("telegram-bot.banned_users", Vec::new())
            .unwrap();
        assert!(banned.is_empty());

        let err = view
            .get::<Vec<String>>("telegram-bot.banned_users")
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingConfigKey { .. }));
    }

    #[test]
    fn test_traversal_through_scalar_counts_as_absent() {
        let view = sample_view();
        let value = view.get_opt::<String>("telegram.api_id.nested").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let view = sample_view();
        let err = view.get::<i64>("telegram.api_hash").unwrap_err();
        match err {
            DomainError::Config(msg) => assert!(msg.contains("telegram.api_hash")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_app_config_resolves_with_defaults() {
        let cfg = AppConfig::from_view(&sample_view()).unwrap();
        assert_eq!(cfg.telegram.api_id, 12345);
        assert_eq!(cfg.bot.banned_users, vec!["spammer", "flooder"]);
        assert_eq!(cfg.search.host, "http://search:9200");
        assert_eq!(cfg.search.index_prefix, DEFAULT_INDEX_PREFIX);
        assert_eq!(cfg.search.request_timeout_ms, 10_000);
        assert_eq!(cfg.bot.catch_up_grace_ms, 1_000);
    }

    #[test]
    fn test_app_config_missing_required_key_is_fatal() {
        let view = ConfigView::from_yaml("telegram:\n  api_id: 1\n").unwrap();
        let err = AppConfig::from_view(&view).unwrap_err();
        assert!(matches!(err, DomainError::MissingConfigKey { .. }));
    }

    #[test]
    fn test_expand_user_leaves_plain_paths_alone() {
        assert_eq!(expand_user("bot.session"), PathBuf::from("bot.session"));
        assert_eq!(
            expand_user("~alice/bot.session"),
            PathBuf::from("~alice/bot.session")
        );
    }
}

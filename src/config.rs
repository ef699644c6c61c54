//! Configuration types.
//!
//! Everything is read once at startup into a [`RelayConfig`] and passed down
//! explicitly. Core pipeline code never touches the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::http::RetryPolicy;

const DEFAULT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_GRAPH_LOGIN_BASE: &str = "https://login.microsoftonline.com";
const DEFAULT_ARCHIVE_FOLDERS: &str = "Archiv,Archive";
const WECLAPP_UPLOAD_PATH: &str =
    "/webapp/api/v1/purchaseInvoice/startInvoiceDocumentProcessing/multipartUpload";

/// Microsoft Graph credentials and mailbox.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Mailbox owner address (`/users/{mailbox}`).
    pub mailbox: String,
    pub api_base: String,
    pub login_base: String,
}

impl GraphConfig {
    /// Client-credentials token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

/// weclapp document-processing endpoint.
#[derive(Debug, Clone)]
pub struct WeclappConfig {
    pub tenant: String,
    pub api_key: SecretString,
    /// Scheme + host, e.g. `https://acme.weclapp.com`.
    pub base_url: String,
}

impl WeclappConfig {
    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), WECLAPP_UPLOAD_PATH)
    }
}

/// Folder display names to resolve every run.
#[derive(Debug, Clone)]
pub struct FolderConfig {
    pub source: String,
    /// Tried in order; the first existing folder wins.
    pub archive_candidates: Vec<String>,
}

/// Transport settings shared by all outbound calls.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub retry: RetryPolicy,
    /// Timeout for metadata calls (token, folders, messages, moves).
    pub request_timeout: Duration,
    /// Timeout for the batch upload.
    pub upload_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(60),
        }
    }
}

/// When scheduled runs fire.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Pause after each run before the next. The first run fires immediately.
    Interval(Duration),
    /// Cron expression (with seconds field), evaluated in UTC.
    Cron(cron::Schedule),
}

impl Schedule {
    /// Time to wait from now until the next scheduled run.
    pub fn next_delay(&self) -> Option<Duration> {
        match self {
            Self::Interval(d) => Some(*d),
            Self::Cron(schedule) => {
                let next = schedule.upcoming(chrono::Utc).next()?;
                let wait = next - chrono::Utc::now();
                Some(wait.to_std().unwrap_or(Duration::ZERO))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Interval(d) => format!("every {}s", d.as_secs()),
            Self::Cron(schedule) => format!("cron '{schedule}'"),
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub graph: GraphConfig,
    pub weclapp: WeclappConfig,
    pub folders: FolderConfig,
    pub http: HttpConfig,
    pub schedule: Schedule,
    /// Address for the on-demand trigger server. `None` disables it.
    pub http_bind: Option<SocketAddr>,
    /// Directory for a daily-rolling log file. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Legacy variable names are accepted as
    /// fallbacks for the Graph settings.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |keys: &[&str]| -> Result<String, ConfigError> {
            keys.iter()
                .find_map(|key| get(*key))
                .ok_or_else(|| ConfigError::MissingEnvVar(keys[0].to_string()))
        };

        let tenant_id = required(&["GRAPH_TENANT_ID", "TENANT_ID"])?;
        let graph = GraphConfig {
            tenant_id,
            client_id: required(&["GRAPH_CLIENT_ID", "CLIENT_ID"])?,
            client_secret: SecretString::from(required(&["GRAPH_CLIENT_SECRET", "CLIENT_SECRET"])?),
            mailbox: required(&["MAILBOX_ADDRESS", "USER_EMAIL"])?,
            api_base: get("GRAPH_API_BASE").unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            login_base: get("GRAPH_LOGIN_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_LOGIN_BASE.to_string()),
        };

        let tenant = required(&["WECLAPP_TENANT"])?;
        let weclapp = WeclappConfig {
            api_key: SecretString::from(required(&["WECLAPP_API_KEY"])?),
            base_url: get("WECLAPP_BASE_URL")
                .unwrap_or_else(|| format!("https://{tenant}.weclapp.com")),
            tenant,
        };

        let archive_candidates = split_list(
            &get("ARCHIVE_FOLDERS").unwrap_or_else(|| DEFAULT_ARCHIVE_FOLDERS.to_string()),
        );
        if archive_candidates.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ARCHIVE_FOLDERS".into(),
                message: "at least one folder name is required".into(),
            });
        }
        let folders = FolderConfig {
            source: required(&["SOURCE_FOLDER", "FOLDER_NAME"])?,
            archive_candidates,
        };

        let attempts: u32 = parse_or(&get, "RELAY_RETRY_ATTEMPTS", 3)?;
        if attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_RETRY_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }
        let http = HttpConfig {
            retry: RetryPolicy {
                max_attempts: attempts,
                delay: Duration::from_secs(parse_or(&get, "RELAY_RETRY_DELAY_SECS", 5)?),
            },
            request_timeout: Duration::from_secs(parse_or(&get, "RELAY_REQUEST_TIMEOUT_SECS", 10)?),
            upload_timeout: Duration::from_secs(parse_or(&get, "RELAY_UPLOAD_TIMEOUT_SECS", 60)?),
        };

        let schedule = match get("RELAY_CRON") {
            Some(expr) => Schedule::Cron(cron::Schedule::from_str(&expr).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "RELAY_CRON".into(),
                    message: format!("invalid cron: {e}"),
                }
            })?),
            None => {
                let secs: u64 = parse_or(&get, "RELAY_POLL_INTERVAL_SECS", 300)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "RELAY_POLL_INTERVAL_SECS".into(),
                        message: "must be greater than 0".into(),
                    });
                }
                Schedule::Interval(Duration::from_secs(secs))
            }
        };

        let http_bind = get("RELAY_HTTP_BIND")
            .map(|raw| {
                raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
                    key: "RELAY_HTTP_BIND".into(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            graph,
            weclapp,
            folders,
            http,
            schedule,
            http_bind,
            log_dir: get("RELAY_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GRAPH_TENANT_ID", "tenant-1"),
            ("GRAPH_CLIENT_ID", "client-1"),
            ("GRAPH_CLIENT_SECRET", "shh"),
            ("MAILBOX_ADDRESS", "invoices@example.com"),
            ("SOURCE_FOLDER", "Rechnungen"),
            ("WECLAPP_TENANT", "acme"),
            ("WECLAPP_API_KEY", "key-123"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<RelayConfig, ConfigError> {
        RelayConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.graph.mailbox, "invoices@example.com");
        assert_eq!(config.graph.client_secret.expose_secret(), "shh");
        assert_eq!(
            config.graph.token_url(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(config.folders.archive_candidates, vec!["Archiv", "Archive"]);
        assert_eq!(config.http.retry.max_attempts, 3);
        assert_eq!(config.http.retry.delay, Duration::from_secs(5));
        assert_eq!(config.http.request_timeout, Duration::from_secs(10));
        assert_eq!(config.http.upload_timeout, Duration::from_secs(60));
        assert!(matches!(config.schedule, Schedule::Interval(d) if d == Duration::from_secs(300)));
        assert!(config.http_bind.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn weclapp_upload_url_from_tenant() {
        let config = load(&base_env()).unwrap();
        assert_eq!(
            config.weclapp.upload_url(),
            "https://acme.weclapp.com/webapp/api/v1/purchaseInvoice/startInvoiceDocumentProcessing/multipartUpload"
        );
    }

    #[test]
    fn weclapp_base_url_override() {
        let mut env = base_env();
        env.insert("WECLAPP_BASE_URL", "http://127.0.0.1:9000/");
        let config = load(&env).unwrap();
        assert!(config.weclapp.upload_url().starts_with("http://127.0.0.1:9000/webapp/"));
    }

    #[test]
    fn missing_required_is_error() {
        let mut env = base_env();
        env.remove("WECLAPP_API_KEY");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "WECLAPP_API_KEY"));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("SOURCE_FOLDER", "   ");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SOURCE_FOLDER"));
    }

    #[test]
    fn legacy_names_accepted() {
        let mut env = base_env();
        env.remove("GRAPH_TENANT_ID");
        env.remove("MAILBOX_ADDRESS");
        env.remove("SOURCE_FOLDER");
        env.insert("TENANT_ID", "legacy-tenant");
        env.insert("USER_EMAIL", "legacy@example.com");
        env.insert("FOLDER_NAME", "Inbox");
        let config = load(&env).unwrap();
        assert_eq!(config.graph.tenant_id, "legacy-tenant");
        assert_eq!(config.graph.mailbox, "legacy@example.com");
        assert_eq!(config.folders.source, "Inbox");
    }

    #[test]
    fn archive_folder_list_parsed() {
        let mut env = base_env();
        env.insert("ARCHIVE_FOLDERS", " Erledigt , ,Archive ");
        let config = load(&env).unwrap();
        assert_eq!(config.folders.archive_candidates, vec!["Erledigt", "Archive"]);
    }

    #[test]
    fn invalid_number_rejected() {
        let mut env = base_env();
        env.insert("RELAY_RETRY_DELAY_SECS", "soon");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "RELAY_RETRY_DELAY_SECS"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut env = base_env();
        env.insert("RELAY_RETRY_ATTEMPTS", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn cron_schedule_parsed() {
        let mut env = base_env();
        env.insert("RELAY_CRON", "0 */5 * * * *");
        let config = load(&env).unwrap();
        assert!(matches!(config.schedule, Schedule::Cron(_)));
        let delay = config.schedule.next_delay().unwrap();
        assert!(delay <= Duration::from_secs(300));
    }

    #[test]
    fn invalid_cron_rejected() {
        let mut env = base_env();
        env.insert("RELAY_CRON", "every five minutes");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "RELAY_CRON"));
    }

    #[test]
    fn http_bind_parsed() {
        let mut env = base_env();
        env.insert("RELAY_HTTP_BIND", "127.0.0.1:8080");
        let config = load(&env).unwrap();
        assert_eq!(config.http_bind.unwrap().port(), 8080);

        env.insert("RELAY_HTTP_BIND", "not-an-addr");
        assert!(load(&env).is_err());
    }
}

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cron_secret: Option<String>,
    pub supabase: SupabaseConfig,
    pub cleanup: CleanupConfig,
    pub worker: WorkerConfig,
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub default_window_hours: u32,
    pub list_page_size: usize,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field(
                "cron_secret",
                &self.cron_secret.as_ref().map(|_| "***REDACTED***"),
            )
            .field("supabase", &self.supabase)
            .field("cleanup", &self.cleanup)
            .field("worker", &self.worker)
            .finish()
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &"***REDACTED***")
            .field("bucket", &self.bucket)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            supabase: SupabaseConfig {
                url: env_or("SUPABASE_URL", ""),
                service_role_key: env_or("SUPABASE_SERVICE_ROLE_KEY", ""),
                bucket: env_or("STORAGE_BUCKET", "stems"),
                timeout_secs: env_or_parse("SUPABASE_TIMEOUT_SECS", 30_u64),
            },
            cleanup: CleanupConfig {
                default_window_hours: env_or_parse("CLEANUP_DEFAULT_HOURS", 24_u32),
                list_page_size: env_or_parse("CLEANUP_LIST_PAGE_SIZE", 1000_usize),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
        }
    }

    /// Fixed configuration for tests: no process-env reads, so test
    /// binaries do not race the env-mutating tests in this module.
    #[cfg(test)]
    pub(crate) fn test_default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
            cron_secret: None,
            supabase: SupabaseConfig {
                url: "https://project.supabase.co".to_string(),
                service_role_key: "service-key".to_string(),
                bucket: "stems".to_string(),
                timeout_secs: 5,
            },
            cleanup: CleanupConfig {
                default_window_hours: 24,
                list_page_size: 1000,
            },
            worker: WorkerConfig { is_leader: true },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

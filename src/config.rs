use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Wardstat";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SQLite file holding the visit store.
pub const DATABASE_FILE: &str = "visits.db";

/// Rows per insert transaction.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Rows between progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50_000;

/// Remote CSV export; `{id}` is replaced by the opaque resource id.
pub const DEFAULT_EXPORT_URL: &str =
    "https://docs.google.com/spreadsheets/d/{id}/export?format=csv";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Get the application data directory.
/// `WARDSTAT_DATA_DIR` overrides `~/Wardstat/`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("WARDSTAT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Path of the persistent visit store.
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "wardstat=info,wardstat_lib=info,warn"
}

/// Tunables for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records per `insert_batch` call. Must be at least 1.
    pub batch_size: usize,
    /// Emit a progress event every N processed rows.
    pub progress_interval: u64,
    /// URL template for the remote export, containing `{id}`.
    pub export_url_template: String,
    /// TCP connect timeout. The body transfer itself is never timed out.
    pub connect_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            export_url_template: DEFAULT_EXPORT_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `WARDSTAT_BATCH_SIZE` and `WARDSTAT_EXPORT_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = std::env::var("WARDSTAT_BATCH_SIZE")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.batch_size = size;
        }
        if let Ok(url) = std::env::var("WARDSTAT_EXPORT_URL") {
            if url.contains("{id}") {
                config.export_url_template = url;
            } else {
                tracing::warn!(url = %url, "WARDSTAT_EXPORT_URL lacks {{id}} placeholder, ignoring");
            }
        }
        config.batch_size = config.batch_size.max(1);
        config
    }

    /// Resolve the export URL for a resource id.
    pub fn export_url(&self, resource_id: &str) -> String {
        self.export_url_template.replace("{id}", resource_id.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with(DATABASE_FILE));
    }

    #[test]
    fn app_name_is_wardstat() {
        assert_eq!(APP_NAME, "Wardstat");
    }

    #[test]
    fn default_sync_config_matches_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.progress_interval, 50_000);
        assert!(config.export_url_template.contains("{id}"));
    }

    #[test]
    fn export_url_substitutes_resource_id() {
        let config = SyncConfig::default();
        assert_eq!(
            config.export_url(" abc123 "),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv"
        );
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub granola: GranolaConfig,
    pub beeper: BeeperConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Auto-sync default used until the user toggles it.
    pub auto_sync: bool,
    pub interval_minutes: u32,
    /// Deadline for every external CLI invocation.
    pub fetch_timeout_secs: u64,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranolaConfig {
    pub enabled: bool,
    pub cli_path: PathBuf,
    pub config_path: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeeperConfig {
    pub enabled: bool,
    /// BeeperTexts application support directory (presence means Beeper is installed).
    pub app_support_dir: PathBuf,
    /// beeperdb export package (pnpm sync / pnpm clean / bun query.ts).
    pub package_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("lifeos-sync"))
            .unwrap_or_else(|| PathBuf::from("./data"));
        let granola_root = home.join(".lifeos").join("granola").join("cli");

        Self {
            database: DatabaseConfig {
                url: sqlite_url_for(&data_dir),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig {
                auto_sync: true,
                interval_minutes: 10,
                fetch_timeout_secs: 300, // 5 minutes
                batch_size: 100,
            },
            granola: GranolaConfig {
                enabled: true,
                cli_path: granola_root.join("granola"),
                config_path: granola_root.join("config.json"),
                output_dir: granola_root.join("output"),
            },
            beeper: BeeperConfig {
                enabled: true,
                app_support_dir: home
                    .join("Library")
                    .join("Application Support")
                    .join("BeeperTexts"),
                package_dir: home.join(".lifeos").join("packages").join("beeperdb"),
            },
            storage: StorageConfig { data_dir },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // 既定値
        let mut cfg = Self::default();

        if let Some(v) = non_empty(lookup("LIFEOS_DATA_DIR")) {
            cfg.storage.data_dir = PathBuf::from(v);
            cfg.database.url = sqlite_url_for(&cfg.storage.data_dir);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_DATABASE_URL")) {
            cfg.database.url = v;
        }
        if let Some(value) = lookup("LIFEOS_DATABASE_MAX_CONNECTIONS")
            .as_deref()
            .and_then(parse_u32)
        {
            cfg.database.max_connections = value;
        }

        // 同期設定
        if let Some(v) = lookup("LIFEOS_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = lookup("LIFEOS_SYNC_INTERVAL_MINUTES")
            .as_deref()
            .and_then(parse_u32)
        {
            cfg.sync.interval_minutes = value.max(1);
        }
        if let Some(value) = lookup("LIFEOS_FETCH_TIMEOUT_SECS")
            .as_deref()
            .and_then(parse_u64)
        {
            cfg.sync.fetch_timeout_secs = value.max(1);
        }
        if let Some(value) = lookup("LIFEOS_SYNC_BATCH_SIZE")
            .as_deref()
            .and_then(parse_u32)
        {
            cfg.sync.batch_size = value.max(1);
        }

        // Granola
        if let Some(v) = lookup("LIFEOS_GRANOLA_ENABLED") {
            cfg.granola.enabled = parse_bool(&v, cfg.granola.enabled);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_GRANOLA_CLI_PATH")) {
            cfg.granola.cli_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_GRANOLA_CONFIG_PATH")) {
            cfg.granola.config_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_GRANOLA_OUTPUT_DIR")) {
            cfg.granola.output_dir = PathBuf::from(v);
        }

        // Beeper
        if let Some(v) = lookup("LIFEOS_BEEPER_ENABLED") {
            cfg.beeper.enabled = parse_bool(&v, cfg.beeper.enabled);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_BEEPER_APP_DIR")) {
            cfg.beeper.app_support_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup("LIFEOS_BEEPER_PACKAGE_DIR")) {
            cfg.beeper.package_dir = PathBuf::from(v);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.interval_minutes == 0 {
            return Err("Sync interval_minutes must be greater than 0".to_string());
        }
        if self.sync.fetch_timeout_secs == 0 {
            return Err("Sync fetch_timeout_secs must be greater than 0".to_string());
        }
        if self.sync.batch_size == 0 {
            return Err("Sync batch_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn sqlite_url_for(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("lifeos-sync.db").display())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

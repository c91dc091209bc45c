use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Reserved names of the per-application set/module that parks unassigned hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreePoolNames {
    pub set_name: String,
    pub module_name: String,
}

impl Default for FreePoolNames {
    fn default() -> Self {
        Self {
            set_name: default_free_pool_set_name(),
            module_name: default_free_pool_module_name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CmdbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub log_dir: String,
    pub free_pool: FreePoolNames,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug, PartialEq)]
pub struct PartialCmdbConfig {
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub log_dir: Option<String>,
    pub free_pool_set_name: Option<String>,
    pub free_pool_module_name: Option<String>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_free_pool_set_name() -> String {
    "空闲机池".to_string()
}

fn default_free_pool_module_name() -> String {
    "空闲机".to_string()
}

impl PartialCmdbConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(env::vars())
    }

    /// `DATABASE_URL` is read as-is; every other key carries the `CMDB_` prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let database: DatabaseEnv = envy::from_iter(vars.iter().cloned())
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;
        let prefixed: PrefixedEnv = envy::prefixed("CMDB_")
            .from_iter(vars)
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;
        Ok(Self {
            database_url: database.database_url,
            max_connections: prefixed.max_connections,
            log_dir: prefixed.log_dir,
            free_pool_set_name: prefixed.free_pool_set_name,
            free_pool_module_name: prefixed.free_pool_module_name,
        })
    }
}

#[derive(Deserialize, Default, Debug)]
struct DatabaseEnv {
    database_url: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct PrefixedEnv {
    max_connections: Option<u32>,
    log_dir: Option<String>,
    free_pool_set_name: Option<String>,
    free_pool_module_name: Option<String>,
}

impl CmdbConfig {
    /// Loads the optional TOML file, then lets environment variables (and `.env`)
    /// override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialCmdbConfig::from_file(Path::new(path))?,
            None => PartialCmdbConfig::default(),
        };
        let env_config = PartialCmdbConfig::from_env()?;

        Self::merge(file_config, env_config)
    }

    /// Environment wins over file; defaults fill the rest.
    pub fn merge(file: PartialCmdbConfig, env: PartialCmdbConfig) -> Result<Self, String> {
        Ok(CmdbConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or("DATABASE_URL is required")?,
            max_connections: env
                .max_connections
                .or(file.max_connections)
                .unwrap_or_else(default_max_connections),
            log_dir: env
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            free_pool: FreePoolNames {
                set_name: env
                    .free_pool_set_name
                    .or(file.free_pool_set_name)
                    .unwrap_or_else(default_free_pool_set_name),
                module_name: env
                    .free_pool_module_name
                    .or(file.free_pool_module_name)
                    .unwrap_or_else(default_free_pool_module_name),
            },
        })
    }
}

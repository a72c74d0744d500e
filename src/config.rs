use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SECRET_KEY: &str = "dev-secret";
pub const DEFAULT_XLSX_PATH: &str = "/mnt/data/CONTROL_789.xlsx";
pub const DEFAULT_XLSX_SHEET: &str = "Resumen";
/// First month shown by the dashboard and the report when no `desde` is given.
pub const DEFAULT_DESDE: &str = "2025-04";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            data_dir: home.join("data"),
        });
    }

    let proj = ProjectDirs::from("com", "control-economico", "control-economico").ok_or_else(
        || Error::Io(std::io::Error::other("Failed to resolve platform directories")),
    )?;

    Ok(AppPaths {
        data_dir: proj.data_dir().to_path_buf(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

/// Resolves `DATABASE_URL` (or its absence) into a SQLite location.
///
/// Accepted forms: `sqlite:///abs/path.db`, `sqlite://rel/path.db`,
/// `sqlite::memory:`, `:memory:` and plain file paths.
pub fn resolve_database(url: Option<&str>, paths: &AppPaths) -> Result<DatabaseLocation> {
    let Some(raw) = url.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DatabaseLocation::File(default_database_path(paths)));
    };

    if raw.starts_with("postgres://") || raw.starts_with("postgresql://") {
        return Err(Error::UnsupportedDatabase(raw.to_string()));
    }

    if matches!(raw, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
        return Ok(DatabaseLocation::Memory);
    }

    if let Some(rest) = raw.strip_prefix("sqlite://") {
        // sqlite:///abs keeps the leading slash, sqlite://rel is relative.
        if rest.is_empty() {
            return Err(Error::UnsupportedDatabase(raw.to_string()));
        }
        return Ok(DatabaseLocation::File(PathBuf::from(rest)));
    }

    if raw.contains("://") {
        return Err(Error::UnsupportedDatabase(raw.to_string()));
    }

    Ok(DatabaseLocation::File(PathBuf::from(raw)))
}

pub fn default_database_path(paths: &AppPaths) -> PathBuf {
    paths.data_dir.join("data.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Settings of the HTTP server.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub secret_key: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
        }
    }
}

impl ServeConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

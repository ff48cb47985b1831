//! Application configuration
//!
//! Configuration is immutable once the pipeline starts. It is assembled from
//! defaults, an optional JSON file and command line overrides, then
//! validated.

mod schema;

pub use schema::*;

use std::path::Path;
use tracing::info;

use crate::error::{AppError, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "LIVECAST_CONFIG";

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, or from `LIVECAST_CONFIG`, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(env_path) => Self::from_file(Path::new(&env_path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{EncodedFormat, Resolution};
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.send_port, 1024);
        assert_eq!(config.server.recv_port, 1025);
        assert_eq!(config.camera.resolution(), Resolution::new(1920, 1080));
        assert_eq!(config.stream.jpeg_quality, 75);
        assert_eq!(config.stream.encoding, EncodedFormat::Jpeg);
        assert!(!config.stream.skip_duplicate_frames);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"send_port": 9000}}, "stream": {{"encoding": "rgba"}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.send_port, 9000);
        assert_eq!(config.server.recv_port, 1025);
        assert_eq!(config.stream.encoding, EncodedFormat::Rgba);
        assert_eq!(config.camera.width, 1920);
    }

    #[test]
    fn test_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            AppConfig::from_file(&missing),
            Err(AppError::Config(_))
        ));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ server = 1 }").unwrap();
        assert!(matches!(
            AppConfig::from_file(&garbage),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.stream.jpeg_quality = 101;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.recv_port = 1024;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.host = "not an ip".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.camera.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolution_limit() {
        let config = AppConfig::default();
        assert_eq!(config.camera.max_resolution(), Resolution::new(3840, 2160));

        let mut config = AppConfig::default();
        config.camera.width = 4096;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let mut config = AppConfig::default();
        config.camera.max_width = Resolution::MAX_WIDTH + 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.camera.max_width = 1920;
        config.camera.max_height = 1080;
        config.validate().unwrap();
    }

    #[test]
    fn test_addresses() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        assert_eq!(
            config.server.send_addr().unwrap().to_string(),
            "127.0.0.1:1024"
        );
        assert_eq!(
            config.server.recv_addr().unwrap().to_string(),
            "127.0.0.1:1025"
        );
    }
}

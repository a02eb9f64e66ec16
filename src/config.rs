use config::{Config, ConfigError, Environment, File, Value};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub server: ServerConfig,
    pub prepare: PrepareConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub fulls_directory: String,
    pub host: String,
    pub port: u16,
    pub allowed_extensions: HashSet<String>,
    /// Written to the Software tag of every edited image.
    pub software_tag: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrepareConfig {
    pub root_directory: String,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub jpeg_quality: u8,
    /// 0 = one worker per CPU, 1 = sequential.
    pub workers: usize,
    pub check: bool,
    pub sample_images: usize,
    pub sample_width: u32,
    pub sample_height: u32,
}

impl PrepareConfig {
    pub fn fulls_directory(&self) -> PathBuf {
        Path::new(&self.root_directory).join("fulls")
    }

    pub fn thumbs_directory(&self) -> PathBuf {
        Path::new(&self.root_directory).join("thumbs")
    }

    pub fn metadata_directory(&self) -> PathBuf {
        Path::new(&self.root_directory).join("metadata")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.metadata_directory().join("metadata.json")
    }
}

impl AppConfig {
    /// Layers built-in defaults, `<config_dir>/default`, `<config_dir>/<RUN_MODE>`,
    /// `<config_dir>/local`, `GALLERY_*` environment variables and finally
    /// `overrides` (command-line flags).
    pub fn new(config_dir: &Path, overrides: Vec<(&'static str, Value)>) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| File::from(config_dir.join(name)).required(false);

        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("server.fulls_directory", "fulls")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default(
                "server.allowed_extensions",
                vec!["png", "jpg", "jpeg", "gif", "bmp", "tiff"],
            )?
            .set_default("server.software_tag", "gallery_prep EXIF editor")?
            .set_default("prepare.root_directory", "images")?
            .set_default("prepare.thumbnail_width", 400)?
            .set_default("prepare.thumbnail_height", 300)?
            .set_default("prepare.jpeg_quality", 80)?
            .set_default("prepare.workers", 0)?
            .set_default("prepare.check", false)?
            .set_default("prepare.sample_images", 0)?
            .set_default("prepare.sample_width", 4000)?
            .set_default("prepare.sample_height", 3000)?
            .add_source(file("default"))
            .add_source(file(&env))
            .add_source(file("local"))
            .add_source(
                Environment::with_prefix("GALLERY")
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (key, value) in overrides {
            builder = builder.set_override(key, value)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prepare = &self.prepare;
        if !(1..=100).contains(&prepare.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "prepare.jpeg_quality must be between 1 and 100, got {}",
                prepare.jpeg_quality
            )));
        }
        if prepare.thumbnail_width == 0 || prepare.thumbnail_height == 0 {
            return Err(ConfigError::Message("thumbnail dimensions must be non-zero".into()));
        }
        if prepare.sample_width == 0 || prepare.sample_height == 0 {
            return Err(ConfigError::Message("sample dimensions must be non-zero".into()));
        }
        Ok(())
    }

    /// Lowercased extensions the listing page shows.
    pub fn gallery_extensions(&self) -> HashSet<String> {
        self.server
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_files() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::new(dir.path(), Vec::new()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.prepare.jpeg_quality, 80);
        assert_eq!(config.prepare.thumbnail_width, 400);
        assert!(config.gallery_extensions().contains("jpeg"));
        assert_eq!(config.prepare.catalog_path(), Path::new("images/metadata/metadata.json"));
    }

    #[test]
    fn files_and_overrides_layer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("local.toml"),
            "[server]\nport = 9000\nhost = \"0.0.0.0\"\n",
        )
        .unwrap();

        let config = AppConfig::new(dir.path(), vec![("server.port", Value::from(9100_i64))]).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = AppConfig::new(dir.path(), vec![("prepare.jpeg_quality", Value::from(0_i64))]);
        assert!(result.is_err());
    }
}

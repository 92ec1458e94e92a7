//! Shoebox configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults;
//! 2. a config file (TOML, YAML or JSON by extension), either given
//!    explicitly or `config.toml` in the user's config directory if present;
//! 3. `SHOEBOX_` environment variables, nesting with `__`
//!    (`SHOEBOX_LIBRARY__META_DIR=/var/lib/shoebox`).

pub mod error;
mod model;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

pub use crate::model::{Config, LibraryConfig, LogConfig, ProcessingConfig, ScannerConfig};

pub const ENV_PREFIX: &str = "SHOEBOX_";

/// `config.toml` in the platform config directory.
pub fn default_path() -> Option<PathBuf> {
    model::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Merge every source and validate the result.
    ///
    /// An explicit `path` must exist; the default location is skipped when
    /// it doesn't.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|path| path.is_file()),
        };
        let config = Self::extract(Self::figment(file.as_deref())?)?;
        tracing::debug!(file = ?file, media_dirs = ?config.library.media_dirs, "Configuration loaded");
        Ok(config)
    }

    /// The provider chain, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.library.validate()?;
        self.processing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn dirs() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["photos", "uploads", "meta"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        dir
    }

    fn toml(dir: &Path) -> String {
        format!(
            r#"
            [library]
            media_dirs = ["{root}/photos"]
            uploads_dir = "{root}/uploads"
            meta_dir = "{root}/meta"

            [processing]
            filename_date_regex = '\d{{8}}_\d{{6}}'
            filename_date_format = "[year][month][day]_[hour][minute][second]"
            "#,
            root = dir.display()
        )
    }

    #[test]
    fn test_file_then_env() {
        let dir = dirs();
        Jail::expect_with(|jail| {
            jail.create_file("shoebox.toml", &toml(dir.path()))?;
            jail.set_env("SHOEBOX_PROCESSING__THUMBNAIL_SIZE", "128");
            jail.set_env("SHOEBOX_LOG__FILTER", "shoebox=debug");

            let config = Config::load(Some(Path::new("shoebox.toml"))).unwrap();
            assert_eq!(config.library.media_dirs, [dir.path().join("photos")]);
            assert_eq!(config.processing.thumbnail_size, 128);
            assert_eq!(config.log.filter.as_deref(), Some("shoebox=debug"));
            assert!(config.processing.filename_date().unwrap().is_some());
            assert_eq!(config.scanner, ScannerConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_json_file() {
        let dir = dirs();
        let root = dir.path().display();
        Jail::expect_with(|jail| {
            jail.create_file(
                "shoebox.json",
                &format!(
                    r#"{{"library": {{"media_dirs": ["{root}/photos"], "uploads_dir": "{root}/uploads", "meta_dir": "{root}/meta"}},
                        "scanner": {{"video_extensions": ["mp4"]}}}}"#
                ),
            )?;
            let config = Config::load(Some(Path::new("shoebox.json"))).unwrap();
            assert_eq!(config.scanner.video_extensions, ["mp4"]);
            assert_eq!(config.scanner.image_extensions, ScannerConfig::default().image_extensions);
            Ok(())
        });
    }

    #[rstest]
    #[case::missing("absent.toml")]
    #[case::format("shoebox.ini")]
    fn test_unusable_file(#[case] name: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("shoebox.ini", "")?;
            let err = Config::load(Some(Path::new(name))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_) | ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_malformed_values_are_invalid() {
        let dir = dirs();
        Jail::expect_with(|jail| {
            jail.create_file("shoebox.toml", &toml(dir.path()))?;
            jail.set_env("SHOEBOX_PROCESSING__THUMBNAIL_SIZE", "huge");
            let err = Config::load(Some(Path::new("shoebox.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid));
            Ok(())
        });
    }

    #[test]
    fn test_defaults_alone_are_rejected() {
        Jail::expect_with(|_| {
            let err = Config::extract(Config::figment(None).unwrap()).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NoMediaDirs));
            Ok(())
        });
    }
}

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::taxonomy::Taxonomy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub http: HttpConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub taxonomy: TaxonomySource,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        let config = Self::parse(&contents)?;
        log::debug!("Loaded config from {}", path.to_string_lossy());
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(contents).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.database.in_memory && self.database.path.is_none() {
            bail!("database.path is required unless database.in_memory is set");
        }
        self.engine.validate()
    }

    /// Mood table named by `[taxonomy] path`, or the built-in one.
    pub fn load_taxonomy(&self) -> anyhow::Result<Taxonomy> {
        match &self.taxonomy.path {
            Some(path) => Taxonomy::load(path)
                .with_context(|| format!("Failed to load taxonomy {}", path.to_string_lossy())),
            None => Taxonomy::builtin().with_context(|| "Failed to load built-in taxonomy"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
    /// How long a query waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Tuning knobs of the recommendation engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of tracks fetched from the store per request.
    pub candidate_limit: usize,
    /// Maximum playlist length.
    pub playlist_limit: usize,
    /// Flat bonus for tracks whose features fit the mood.
    pub match_bonus: f64,
    /// Points per play.
    pub popularity_weight: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 200,
            playlist_limit: 50,
            match_bonus: 50.0,
            popularity_weight: 0.1,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("candidate_limit", self.candidate_limit),
            ("playlist_limit", self.playlist_limit),
        ] {
            if value == 0 {
                bail!("engine.{name} must be at least 1");
            }
        }
        for (name, value) in [
            ("match_bonus", self.match_bonus),
            ("popularity_weight", self.popularity_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("engine.{name} must be a non-negative number, got {value}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct TaxonomySource {
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080
"#;

        let cfg = Config::parse(toml_str)?;

        assert_eq!(cfg.version, 1);
        assert!(cfg.database.in_memory);
        assert_eq!(cfg.database.busy_timeout_ms, 5_000);
        assert_eq!(cfg.http.port, 8080);

        // engine section falls back to defaults
        assert_eq!(cfg.engine, EngineConfig::default());
        assert_eq!(cfg.engine.candidate_limit, 200);
        assert_eq!(cfg.engine.playlist_limit, 50);
        assert_eq!(cfg.engine.match_bonus, 50.0);
        assert_eq!(cfg.engine.popularity_weight, 0.1);

        assert!(cfg.taxonomy.path.is_none());

        Ok(())
    }

    #[test]
    fn test_parse_file_database_config() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = false
path = "/tmp/moodlist.db"
busy_timeout_ms = 250

[http]
bind_addr = "127.0.0.1"
port = 8080

[engine]
playlist_limit = 20
popularity_weight = 0.5

[taxonomy]
path = "/etc/moodlist/moods.toml"
"#;

        let cfg = Config::parse(toml_str)?;

        assert!(!cfg.database.in_memory);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/moodlist.db")));
        assert_eq!(cfg.database.busy_timeout_ms, 250);

        // partially specified engine section keeps the other defaults
        assert_eq!(cfg.engine.playlist_limit, 20);
        assert_eq!(cfg.engine.popularity_weight, 0.5);
        assert_eq!(cfg.engine.candidate_limit, 200);
        assert_eq!(cfg.engine.match_bonus, 50.0);

        assert_eq!(
            cfg.taxonomy.path,
            Some(PathBuf::from("/etc/moodlist/moods.toml"))
        );

        Ok(())
    }

    #[test]
    fn test_file_database_requires_path() {
        let toml_str = r#"
version = 1

[database]
in_memory = false

[http]
bind_addr = "127.0.0.1"
port = 8080
"#;

        assert!(Config::parse(toml_str).is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let toml_str = r#"
version = 1

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080

[engine]
match_bonus = -1.0
"#;

        assert!(Config::parse(toml_str).is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        for section in ["candidate_limit = 0", "playlist_limit = 0"] {
            let toml_str = format!(
                r#"
version = 1

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080

[engine]
{section}
"#
            );

            let err = Config::parse(&toml_str).unwrap_err();
            assert!(err.to_string().contains("at least 1"), "{section}: {err}");
        }
    }

    #[test]
    fn test_load_config_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
version = 2

[database]
in_memory = true

[http]
bind_addr = "0.0.0.0"
port = 9000
"#,
        )?;

        let cfg = Config::load(&path)?;

        assert_eq!(cfg.version, 2);
        assert_eq!(cfg.http.bind_addr, "0.0.0.0");

        assert!(Config::load(&dir.path().join("missing.toml")).is_err());

        Ok(())
    }

    #[test]
    fn test_repository_config_parses() -> anyhow::Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml");
        let cfg = Config::load(&path)?;
        assert_eq!(cfg.engine, EngineConfig::default());
        Ok(())
    }

    #[test]
    fn test_builtin_taxonomy_when_no_path() -> anyhow::Result<()> {
        let cfg = Config::parse(
            r#"
version = 1

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080
"#,
        )?;

        let taxonomy = cfg.load_taxonomy()?;
        assert!(taxonomy.get("workout").is_some());

        Ok(())
    }
}

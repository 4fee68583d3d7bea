use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Deserializer};

use crate::dsn::DsnSchemaMode;

pub const DEFAULT_CONFIG_FILE: &str = "mydiff-demo.yaml";

/// A reachable database server, written as `host:port`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let Some((host, port)) = value.rsplit_once(':') else {
            anyhow::bail!("invalid endpoint '{value}'; expected host:port");
        };
        if host.is_empty() {
            anyhow::bail!("invalid endpoint '{value}'; host cannot be empty");
        }
        let port = port
            .parse::<u16>()
            .with_context(|| format!("invalid endpoint '{value}'; port must be a number"))?;
        Ok(Self::new(host, port))
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Optional on-disk overrides. Every field falls back to [`DemoConfig::default`].
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DemoConfigFile {
    #[serde(default)]
    pub server1: Option<Endpoint>,
    #[serde(default)]
    pub server2: Option<Endpoint>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub sql_dir: Option<PathBuf>,
    #[serde(default)]
    pub dockerfile: Option<PathBuf>,
    #[serde(default)]
    pub build_context: Option<PathBuf>,
    #[serde(default)]
    pub tool_path: Option<String>,
    #[serde(default)]
    pub mysql_binary: Option<String>,
    #[serde(default)]
    pub docker_binary: Option<String>,
    #[serde(default)]
    pub tty: Option<bool>,
    #[serde(default)]
    pub dsn_schema: Option<DsnSchemaMode>,
}

/// Resolved, immutable settings for one demo run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoConfig {
    pub server1: Endpoint,
    pub server2: Endpoint,
    pub schema: String,
    pub user: String,
    pub sql_dir: PathBuf,
    pub dockerfile: PathBuf,
    pub build_context: PathBuf,
    pub tool_path: String,
    pub mysql_binary: String,
    pub docker_binary: String,
    pub tty: bool,
    /// Forces a DSN mode for every script; `None` lets the script decide.
    pub dsn_schema: Option<DsnSchemaMode>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            server1: Endpoint::new("127.0.0.1", 33060),
            server2: Endpoint::new("127.0.0.1", 33062),
            schema: "acme_inc".to_string(),
            user: "root".to_string(),
            sql_dir: PathBuf::from("sql"),
            dockerfile: PathBuf::from("Dockerfile.client"),
            build_context: PathBuf::from("."),
            tool_path: "/mydiff".to_string(),
            mysql_binary: "mysql".to_string(),
            docker_binary: "docker".to_string(),
            tty: true,
            dsn_schema: None,
        }
    }
}

/// Command-line overrides, applied last.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub server1: Option<Endpoint>,
    pub server2: Option<Endpoint>,
    pub schema: Option<String>,
    pub sql_dir: Option<PathBuf>,
    pub dsn_schema: Option<DsnSchemaMode>,
}

impl DemoConfig {
    pub fn apply_file(mut self, file: DemoConfigFile) -> Self {
        if let Some(server1) = file.server1 {
            self.server1 = server1;
        }
        if let Some(server2) = file.server2 {
            self.server2 = server2;
        }
        if let Some(schema) = file.schema {
            self.schema = schema;
        }
        if let Some(user) = file.user {
            self.user = user;
        }
        if let Some(sql_dir) = file.sql_dir {
            self.sql_dir = sql_dir;
        }
        if let Some(dockerfile) = file.dockerfile {
            self.dockerfile = dockerfile;
        }
        if let Some(build_context) = file.build_context {
            self.build_context = build_context;
        }
        if let Some(tool_path) = file.tool_path {
            self.tool_path = tool_path;
        }
        if let Some(mysql_binary) = file.mysql_binary {
            self.mysql_binary = mysql_binary;
        }
        if let Some(docker_binary) = file.docker_binary {
            self.docker_binary = docker_binary;
        }
        if let Some(tty) = file.tty {
            self.tty = tty;
        }
        if file.dsn_schema.is_some() {
            self.dsn_schema = file.dsn_schema;
        }
        self
    }

    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(server1) = overrides.server1 {
            self.server1 = server1;
        }
        if let Some(server2) = overrides.server2 {
            self.server2 = server2;
        }
        if let Some(schema) = overrides.schema {
            self.schema = schema;
        }
        if let Some(sql_dir) = overrides.sql_dir {
            self.sql_dir = sql_dir;
        }
        if overrides.dsn_schema.is_some() {
            self.dsn_schema = overrides.dsn_schema;
        }
        self
    }

    /// Host, schema, and user are spliced into the container's `sh -c` line,
    /// so they are limited to characters the shell passes through literally.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.schema.trim().is_empty() {
            anyhow::bail!("schema name cannot be empty");
        }
        if self.user.trim().is_empty() {
            anyhow::bail!("database user cannot be empty");
        }
        check_shell_safe("schema name", &self.schema)?;
        check_shell_safe("database user", &self.user)?;
        check_shell_safe("server1 host", &self.server1.host)?;
        check_shell_safe("server2 host", &self.server2.host)?;
        Ok(())
    }
}

fn check_shell_safe(what: &str, value: &str) -> anyhow::Result<()> {
    if let Some(bad) = value
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || "._:-".contains(*ch)))
    {
        anyhow::bail!("invalid {what} '{value}'; character {bad:?} is not allowed");
    }
    Ok(())
}

pub fn load_config_file(path: &Path) -> anyhow::Result<Option<DemoConfigFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    if contents
        .lines()
        .all(|line| line.trim().is_empty() || line.trim().starts_with('#'))
    {
        return Ok(None);
    }
    let file: DemoConfigFile = serde_yaml_bw::from_str(&contents)
        .with_context(|| format!("unable to parse config {}", path.display()))?;
    Ok(Some(file))
}

/// Resolves defaults, then the config file (explicit path or
/// `mydiff-demo.yaml` in the working directory), then CLI overrides.
pub fn resolve_config(
    explicit: Option<&Path>,
    overrides: ConfigOverrides,
) -> anyhow::Result<DemoConfig> {
    let mut config = DemoConfig::default();
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            if let Some(file) = load_config_file(path)? {
                config = config.apply_file(file);
            }
        }
        None => {
            if let Some(file) = load_config_file(Path::new(DEFAULT_CONFIG_FILE))? {
                config = config.apply_file(file);
            }
        }
    }
    let config = config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoints() {
        let endpoint: Endpoint = "127.0.0.1:33060".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("127.0.0.1", 33060));
        assert_eq!(endpoint.to_string(), "127.0.0.1:33060");

        assert!("127.0.0.1".parse::<Endpoint>().is_err());
        assert!(":3306".parse::<Endpoint>().is_err());
        assert!("db:port".parse::<Endpoint>().is_err());
        assert!("db:70000".parse::<Endpoint>().is_err());
    }

    #[test]
    fn defaults_match_demo_servers() {
        let config = DemoConfig::default();
        assert_eq!(config.server1.to_string(), "127.0.0.1:33060");
        assert_eq!(config.server2.to_string(), "127.0.0.1:33062");
        assert_eq!(config.schema, "acme_inc");
        assert_eq!(config.dsn_schema, None);
    }

    #[test]
    fn file_then_overrides_take_precedence() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("demo.yaml");
        std::fs::write(
            &path,
            "server1: \"db1:3306\"\nschema: shop\ntty: false\ndsn_schema: include\n",
        )?;
        let config = resolve_config(
            Some(path.as_path()),
            ConfigOverrides {
                schema: Some("warehouse".to_string()),
                ..ConfigOverrides::default()
            },
        )?;
        assert_eq!(config.server1, Endpoint::new("db1", 3306));
        assert_eq!(config.server2, Endpoint::new("127.0.0.1", 33062));
        assert_eq!(config.schema, "warehouse");
        assert!(!config.tty);
        assert_eq!(config.dsn_schema, Some(DsnSchemaMode::Include));
        Ok(())
    }

    #[test]
    fn comment_only_file_is_ignored() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("demo.yaml");
        std::fs::write(&path, "# nothing here\n\n")?;
        assert!(load_config_file(&path)?.is_none());
        Ok(())
    }

    #[test]
    fn missing_explicit_config_errors() {
        let err = resolve_config(
            Some(Path::new("/nonexistent/mydiff-demo.yaml")),
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn rejects_blank_schema() {
        let config = DemoConfig {
            schema: "  ".to_string(),
            ..DemoConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DemoConfig {
            schema: "acme inc".to_string(),
            ..DemoConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        let host: Endpoint = "$(id):3306".parse().unwrap();
        let config = DemoConfig {
            server1: host,
            ..DemoConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server1 host '$(id)'"));

        for schema in ["acme`x`", "acme;ls", "a\"b", "$HOME"] {
            let config = DemoConfig {
                schema: schema.to_string(),
                ..DemoConfig::default()
            };
            assert!(config.validate().is_err(), "{schema}");
        }

        let config = DemoConfig {
            server2: Endpoint::new("db-2.internal", 3306),
            schema: "acme_inc.v2".to_string(),
            ..DemoConfig::default()
        };
        config.validate().unwrap();
    }
}

//! Demo scripts as data: an ordered list of narrated actions and waits.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::{DemoConfig, Endpoint};
use crate::dsn::DsnSchemaMode;

pub const DEFAULT_SCRIPT: &str = "walkthrough";

const BUILTIN_SCRIPTS: &[(&str, &str)] = &[
    ("walkthrough", include_str!("../scripts/walkthrough.yaml")),
    ("employees", include_str!("../scripts/employees.yaml")),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoScript {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub dsn_schema: DsnSchemaMode,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub outro: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Step {
    /// A titled section whose actions run in order.
    Demo {
        title: String,
        #[serde(default)]
        actions: Vec<Action>,
    },
    Wait {
        #[serde(default)]
        prompt: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Load { file: String, server: ServerRole },
    /// Options token string passed verbatim to the diff tool.
    Diff(String),
    Wait(Option<String>),
    Say(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    Server1,
    Server2,
}

impl ServerRole {
    pub fn endpoint(self, config: &DemoConfig) -> &Endpoint {
        match self {
            Self::Server1 => &config.server1,
            Self::Server2 => &config.server2,
        }
    }
}

impl DemoScript {
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let script: DemoScript = serde_yaml_bw::from_str(source).context("parse demo script")?;
        script.validate()?;
        Ok(script)
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read script {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn builtin(name: &str) -> anyhow::Result<Self> {
        let Some((_, source)) = BUILTIN_SCRIPTS.iter().find(|(id, _)| *id == name) else {
            anyhow::bail!(
                "unknown script '{name}'. Available scripts: {}",
                builtin_names().join(", ")
            );
        };
        Self::parse(source).with_context(|| format!("built-in script {name}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("script name cannot be empty");
        }
        for (index, step) in self.steps.iter().enumerate() {
            let Step::Demo { title, actions } = step else {
                continue;
            };
            if title.trim().is_empty() {
                anyhow::bail!("step {} has an empty title", index + 1);
            }
            for action in actions {
                if let Action::Load { file, .. } = action
                    && file.trim().is_empty()
                {
                    anyhow::bail!("step {} loads a fixture with no file name", index + 1);
                }
            }
        }
        Ok(())
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().flat_map(|step| match step {
            Step::Demo { actions, .. } => actions.as_slice(),
            Step::Wait { .. } => [].as_slice(),
        })
    }

    pub fn fixture_files(&self) -> Vec<&str> {
        self.actions()
            .filter_map(|action| match action {
                Action::Load { file, .. } => Some(file.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every referenced fixture must exist before the first step runs.
    pub fn check_fixtures(&self, sql_dir: &Path) -> anyhow::Result<()> {
        let missing: Vec<String> = self
            .fixture_files()
            .into_iter()
            .map(|file| sql_dir.join(file))
            .filter(|path| !path.is_file())
            .map(|path| path.display().to_string())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("missing fixture files:\n  - {}", missing.join("\n  - "));
        }
        Ok(())
    }
}

pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_SCRIPTS.iter().map(|(name, _)| *name).collect()
}

pub fn builtin_scripts() -> anyhow::Result<Vec<DemoScript>> {
    builtin_names().into_iter().map(DemoScript::builtin).collect()
}

/// Expands `{server1}`, `{server2}` and `{schema}` in narration text.
pub fn render_text(text: &str, config: &DemoConfig) -> String {
    text.replace("{server1}", &config.server1.to_string())
        .replace("{server2}", &config.server2.to_string())
        .replace("{schema}", &config.schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scripts_parse() {
        let scripts = builtin_scripts().unwrap();
        assert_eq!(scripts.len(), 2);
        let walkthrough = DemoScript::builtin("walkthrough").unwrap();
        assert_eq!(walkthrough.dsn_schema, DsnSchemaMode::Omit);
        assert!(walkthrough.banner.is_some());
        let employees = DemoScript::builtin("employees").unwrap();
        assert_eq!(employees.dsn_schema, DsnSchemaMode::Include);
    }

    #[test]
    fn walkthrough_showcases_every_option_combination() {
        let script = DemoScript::builtin("walkthrough").unwrap();
        let options: Vec<&str> = script
            .actions()
            .filter_map(|action| match action {
                Action::Diff(options) => Some(options.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            options,
            vec![
                "-h",
                "-d sql",
                "-d sql -r",
                "-d compact",
                "-d compact -r",
                "-d compact --diff-migrations",
                "-d compact --diff-migrations --diff-migrations-column my_migrations.val",
            ]
        );
        assert_eq!(script.fixture_files().len(), 6);
    }

    #[test]
    fn parses_steps_and_actions() {
        let script = DemoScript::parse(
            r#"
name: tiny
steps:
  - kind: demo
    title: "Load {server1}"
    actions:
      - load: { file: a.sql, server: server2 }
      - wait: ~
      - diff: "-d sql"
  - kind: wait
    prompt: Ready?
  - kind: wait
"#,
        )
        .unwrap();
        assert_eq!(script.dsn_schema, DsnSchemaMode::Omit);
        assert_eq!(script.steps.len(), 3);
        assert_eq!(
            script.steps[0],
            Step::Demo {
                title: "Load {server1}".to_string(),
                actions: vec![
                    Action::Load {
                        file: "a.sql".to_string(),
                        server: ServerRole::Server2,
                    },
                    Action::Wait(None),
                    Action::Diff("-d sql".to_string()),
                ],
            }
        );
        assert_eq!(
            script.steps[1],
            Step::Wait {
                prompt: Some("Ready?".to_string())
            }
        );
        assert_eq!(script.steps[2], Step::Wait { prompt: None });
    }

    #[test]
    fn rejects_untitled_demo_step() {
        let err = DemoScript::parse("name: bad\nsteps:\n  - kind: demo\n    title: \"\"\n")
            .unwrap_err();
        assert!(format!("{err:#}").contains("empty title"));
    }

    #[test]
    fn unknown_builtin_lists_available() {
        let err = DemoScript::builtin("nope").unwrap_err();
        assert!(err.to_string().contains("walkthrough, employees"));
    }

    #[test]
    fn reports_missing_fixtures() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let script = DemoScript::builtin("employees")?;
        let err = script.check_fixtures(dir.path()).unwrap_err();
        assert!(err.to_string().contains("employees_server1.sql"));

        for file in script.fixture_files() {
            std::fs::write(dir.path().join(file), "SELECT 1;\n")?;
        }
        script.check_fixtures(dir.path())?;
        Ok(())
    }

    #[test]
    fn renders_placeholders() {
        let config = DemoConfig::default();
        assert_eq!(
            render_text("servers ({server1}, {server2}) on {schema}", &config),
            "servers (127.0.0.1:33060, 127.0.0.1:33062) on acme_inc"
        );
    }
}

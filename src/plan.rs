use serde::Serialize;

use crate::commands::{DiffInvocation, describe_fixture_load, image_build_request};
use crate::config::DemoConfig;
use crate::dsn::DsnSchemaMode;
use crate::presenter::DEFAULT_PAUSE_PROMPT;
use crate::script::{Action, DemoScript, Step, render_text};

const IMAGE_PLACEHOLDER: &str = "<image>";

#[derive(Clone, Debug, Serialize)]
pub struct ScriptPlan {
    pub script: String,
    pub dsn_schema: DsnSchemaMode,
    pub steps: Vec<PlannedStep>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    #[serde(flatten)]
    pub kind: PlannedKind,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlannedKind {
    Demo {
        title: String,
        actions: Vec<PlannedAction>,
    },
    Wait {
        prompt: String,
    },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PlannedAction {
    Load {
        command: String,
    },
    Diff {
        command: String,
        build: String,
        container: String,
    },
    Wait {
        prompt: String,
    },
    Say {
        message: String,
    },
}

/// Composes every command a run would execute, without executing any.
pub fn build_plan(script: &DemoScript, config: &DemoConfig) -> ScriptPlan {
    let mode = config.dsn_schema.unwrap_or(script.dsn_schema);
    let steps = script
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| PlannedStep {
            index: index + 1,
            kind: match step {
                Step::Demo { title, actions } => PlannedKind::Demo {
                    title: render_text(title, config),
                    actions: actions
                        .iter()
                        .map(|action| plan_action(action, config, mode))
                        .collect(),
                },
                Step::Wait { prompt } => PlannedKind::Wait {
                    prompt: prompt_text(prompt.as_deref()),
                },
            },
        })
        .collect();
    ScriptPlan {
        script: script.name.clone(),
        dsn_schema: mode,
        steps,
    }
}

fn plan_action(action: &Action, config: &DemoConfig, mode: DsnSchemaMode) -> PlannedAction {
    match action {
        Action::Load { file, server } => PlannedAction::Load {
            command: describe_fixture_load(config, file, server.endpoint(config)),
        },
        Action::Diff(options) => {
            let invocation = DiffInvocation::new(
                config,
                &config.server1,
                &config.server2,
                &config.schema,
                options,
                mode,
            );
            PlannedAction::Diff {
                command: invocation.command_line(),
                build: image_build_request(config).command_line(),
                container: invocation.container_command(config, IMAGE_PLACEHOLDER),
            }
        }
        Action::Wait(prompt) => PlannedAction::Wait {
            prompt: prompt_text(prompt.as_deref()),
        },
        Action::Say(message) => PlannedAction::Say {
            message: render_text(message, config),
        },
    }
}

fn prompt_text(prompt: Option<&str>) -> String {
    prompt.unwrap_or(DEFAULT_PAUSE_PROMPT).to_string()
}

pub fn render_text_plan(plan: &ScriptPlan) -> String {
    let mut out = format!("Plan for {} (dsn schema: {:?}):\n", plan.script, plan.dsn_schema);
    for step in &plan.steps {
        match &step.kind {
            PlannedKind::Demo { title, actions } => {
                out.push_str(&format!("  {}. {title}\n", step.index));
                for action in actions {
                    let line = match action {
                        PlannedAction::Load { command } => format!("load  {command}"),
                        PlannedAction::Diff { command, .. } => format!("diff  {command}"),
                        PlannedAction::Wait { prompt } => format!("wait  {prompt}"),
                        PlannedAction::Say { message } => format!("say   {message}"),
                    };
                    out.push_str(&format!("       {line}\n"));
                }
            }
            PlannedKind::Wait { prompt } => {
                out.push_str(&format!("  {}. [wait] {prompt}\n", step.index));
            }
        }
    }
    out
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::CommandRunner;
use crate::config::{self, ConfigOverrides, DemoConfig, Endpoint};
use crate::demo_log;
use crate::dsn::DsnSchemaMode;
use crate::plan::{self, build_plan};
use crate::presenter::ConsolePresenter;
use crate::process::SystemProcessRunner;
use crate::script::{self, DEFAULT_SCRIPT, DemoScript};
use crate::sequencer::Sequencer;
use crate::style;

#[derive(Parser)]
#[command(name = "mydiff-demo")]
#[command(about = "Interactive, narrated demo of the mydiff schema diff tool", version)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Demo config file (default: ./mydiff-demo.yaml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "HOST:PORT")]
    server1: Option<Endpoint>,
    #[arg(long, global = true, value_name = "HOST:PORT")]
    server2: Option<Endpoint>,
    #[arg(long, global = true)]
    schema: Option<String>,
    #[arg(long, global = true)]
    sql_dir: Option<PathBuf>,
    /// Force the schema suffix on (include) or off (omit) for every server DSN.
    #[arg(long, global = true, value_enum)]
    dsn_schema: Option<DsnSchemaMode>,
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,
    #[arg(long, global = true, value_enum, default_value_t = LogLevelArg::Info)]
    log_level: LogLevelArg,
    /// Colour narration; `auto` colours only when stdout is a terminal.
    #[arg(long, global = true, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,
}

#[derive(Subcommand)]
enum Command {
    Run(RunArgs),
    List(ListArgs),
    Plan(PlanArgs),
}

#[derive(Parser)]
#[command(
    about = "Run a demo script, pausing for ENTER between steps.",
    long_about = "Loads fixtures into both servers and runs the containerized diff tool, narrating each step and waiting for the operator before moving on.",
    after_help = "Main options:\n  [SCRIPT] (default: walkthrough)\n\nOptional options:\n  --script-file <PATH>\n  --no-banner"
)]
struct RunArgs {
    /// Built-in script name.
    #[arg(conflicts_with = "script_file")]
    script: Option<String>,
    #[arg(long)]
    script_file: Option<PathBuf>,
    #[arg(long)]
    no_banner: bool,
}

#[derive(Parser)]
#[command(about = "List built-in demo scripts.")]
struct ListArgs {}

#[derive(Parser)]
#[command(
    about = "Print the steps and commands of a script without running anything.",
    after_help = "Main options:\n  [SCRIPT] (default: walkthrough)\n\nOptional options:\n  --script-file <PATH>\n  --format <text|json|yaml> (default: text)"
)]
struct PlanArgs {
    #[arg(conflicts_with = "script_file")]
    script: Option<String>,
    #[arg(long)]
    script_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    format: PlanFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlanFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<LogLevelArg> for demo_log::Level {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Trace => demo_log::Level::Trace,
            LogLevelArg::Debug => demo_log::Level::Debug,
            LogLevelArg::Info => demo_log::Level::Info,
            LogLevelArg::Warn => demo_log::Level::Warn,
            LogLevelArg::Error => demo_log::Level::Error,
        }
    }
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        if let Err(err) = demo_log::init(self.global.log_dir.clone(), self.global.log_level.into())
        {
            eprintln!("demo log disabled: {err}");
        }
        match self.global.color {
            ColorArg::Auto => {}
            ColorArg::Always => style::force_colors(true),
            ColorArg::Never => style::force_colors(false),
        }
        let ctx = AppCtx {
            config: self.global.resolve()?,
        };
        match self.command {
            Command::Run(args) => args.run(&ctx),
            Command::List(args) => args.run(),
            Command::Plan(args) => args.run(&ctx),
        }
    }
}

struct AppCtx {
    config: DemoConfig,
}

impl GlobalArgs {
    fn resolve(&self) -> anyhow::Result<DemoConfig> {
        config::resolve_config(
            self.config.as_deref(),
            ConfigOverrides {
                server1: self.server1.clone(),
                server2: self.server2.clone(),
                schema: self.schema.clone(),
                sql_dir: self.sql_dir.clone(),
                dsn_schema: self.dsn_schema,
            },
        )
    }
}

fn select_script(name: Option<&str>, file: Option<&PathBuf>) -> anyhow::Result<DemoScript> {
    match file {
        Some(path) => DemoScript::load_file(path),
        None => DemoScript::builtin(name.unwrap_or(DEFAULT_SCRIPT)),
    }
}

impl RunArgs {
    fn run(self, ctx: &AppCtx) -> anyhow::Result<()> {
        let script = select_script(self.script.as_deref(), self.script_file.as_ref())?;
        script.check_fixtures(&ctx.config.sql_dir)?;

        let commands = CommandRunner::new(ctx.config.clone(), SystemProcessRunner);
        let mut sequencer =
            Sequencer::new(ConsolePresenter::stdio(), commands).show_banner(!self.no_banner);
        sequencer.run(&script)
    }
}

impl ListArgs {
    fn run(self) -> anyhow::Result<()> {
        for script in script::builtin_scripts()? {
            println!("{:<12} {}", script.name, script.description);
        }
        Ok(())
    }
}

impl PlanArgs {
    fn run(self, ctx: &AppCtx) -> anyhow::Result<()> {
        let script = select_script(self.script.as_deref(), self.script_file.as_ref())?;
        let plan = build_plan(&script, &ctx.config);
        match self.format {
            PlanFormat::Text => {
                print!("{}", plan::render_text_plan(&plan));
                Ok(())
            }
            PlanFormat::Json => {
                let json = serde_json::to_string_pretty(&plan)?;
                println!("{json}");
                Ok(())
            }
            PlanFormat::Yaml => {
                let yaml = serde_yaml_bw::to_string(&plan)?;
                print!("{yaml}");
                Ok(())
            }
        }
    }
}

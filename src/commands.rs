use std::path::PathBuf;

use anyhow::Context;

use crate::config::{DemoConfig, Endpoint};
use crate::demo_log;
use crate::dsn::{DsnSchemaMode, server_dsn};
use crate::presenter::Presenter;
use crate::process::{ProcessOutput, ProcessRequest, ProcessRunner, StdinSource};

/// A fixture file streamed into the database client of one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureInvocation {
    pub path: PathBuf,
    pub endpoint: Endpoint,
    pub contents: String,
    pub request: ProcessRequest,
}

impl FixtureInvocation {
    /// Reads the fixture; a missing or unreadable file is fatal to the run.
    pub fn build(config: &DemoConfig, file: &str, endpoint: &Endpoint) -> anyhow::Result<Self> {
        let path = config.sql_dir.join(file);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("unable to read fixture {}", path.display()))?;
        let contents = String::from_utf8_lossy(&bytes).to_string();
        let request = client_request(config, endpoint).stdin(StdinSource::Bytes(bytes));
        Ok(Self {
            path,
            endpoint: endpoint.clone(),
            contents,
            request,
        })
    }

    pub fn command_line(&self) -> String {
        fixture_command_line(&self.request, &self.path)
    }
}

/// `mysql -u root -h <host> -P <port> < <sql_dir>/<file>`, without touching the file.
pub fn describe_fixture_load(config: &DemoConfig, file: &str, endpoint: &Endpoint) -> String {
    fixture_command_line(&client_request(config, endpoint), &config.sql_dir.join(file))
}

fn client_request(config: &DemoConfig, endpoint: &Endpoint) -> ProcessRequest {
    ProcessRequest::new(&config.mysql_binary).args([
        "-u".to_string(),
        config.user.clone(),
        "-h".to_string(),
        endpoint.host.clone(),
        "-P".to_string(),
        endpoint.port.to_string(),
    ])
}

fn fixture_command_line(request: &ProcessRequest, path: &std::path::Path) -> String {
    format!("{} < {}", request.command_line(), path.display())
}

/// One execution of the diff tool with a verbatim options string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffInvocation {
    pub tool_path: String,
    pub server1_dsn: String,
    pub server2_dsn: String,
    pub options: String,
    pub schema: String,
}

impl DiffInvocation {
    pub fn new(
        config: &DemoConfig,
        source: &Endpoint,
        target: &Endpoint,
        schema: &str,
        options: &str,
        mode: DsnSchemaMode,
    ) -> Self {
        Self {
            tool_path: config.tool_path.clone(),
            server1_dsn: server_dsn(&config.user, source, schema, mode),
            server2_dsn: server_dsn(&config.user, target, schema, mode),
            options: options.to_string(),
            schema: schema.to_string(),
        }
    }

    pub fn tool_name(&self) -> &str {
        self.tool_path
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or(&self.tool_path)
    }

    /// `--server1 "<dsn>" --server2 "<dsn>" <options> <schema>`
    pub fn arguments(&self) -> String {
        let mut parts = vec![
            format!("--server1 \"{}\"", self.server1_dsn),
            format!("--server2 \"{}\"", self.server2_dsn),
        ];
        if !self.options.is_empty() {
            parts.push(self.options.clone());
        }
        parts.push(self.schema.clone());
        parts.join(" ")
    }

    /// What the operator sees, e.g. `mydiff --server1 "root@tcp(...)/" ... acme_inc`.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.tool_name(), self.arguments())
    }

    /// The shell line that runs the tool inside the freshly built image.
    pub fn container_command(&self, config: &DemoConfig, image: &str) -> String {
        let mut parts = vec![
            config.docker_binary.clone(),
            "run".to_string(),
            "--network=host".to_string(),
            "--rm".to_string(),
        ];
        if config.tty {
            parts.push("-it".to_string());
        }
        parts.push(image.to_string());
        parts.push(format!("{} {}", self.tool_path, self.arguments()));
        parts.join(" ")
    }
}

pub fn image_build_request(config: &DemoConfig) -> ProcessRequest {
    ProcessRequest::new(&config.docker_binary)
        .args(["build", "-q", "-f"])
        .arg(config.dockerfile.display().to_string())
        .arg(config.build_context.display().to_string())
}

/// Executes fixture loads and containerized diff runs, narrating each.
pub struct CommandRunner<R> {
    config: DemoConfig,
    processes: R,
    dsn_mode: DsnSchemaMode,
}

impl<R: ProcessRunner> CommandRunner<R> {
    pub fn new(config: DemoConfig, processes: R) -> Self {
        let dsn_mode = config.dsn_schema.unwrap_or_default();
        Self {
            config,
            processes,
            dsn_mode,
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn dsn_mode(&self) -> DsnSchemaMode {
        self.dsn_mode
    }

    pub fn set_dsn_mode(&mut self, mode: DsnSchemaMode) {
        self.dsn_mode = mode;
    }

    pub fn processes(&self) -> &R {
        &self.processes
    }

    /// Echoes the fixture, then pipes it into the database client. The
    /// client's exit status is logged but never checked.
    pub fn load_fixture<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
        file: &str,
        endpoint: &Endpoint,
    ) -> anyhow::Result<()> {
        let invocation = FixtureInvocation::build(&self.config, file, endpoint)?;
        let command_line = invocation.command_line();
        presenter.narrate(&format!("Loading sql: {command_line}"))?;
        presenter.echo(&invocation.contents)?;
        demo_log::info(module_path!(), format!("loading fixture: {command_line}"));

        let output = self.processes.run(&invocation.request)?;
        log_exit(&command_line, &output);
        presenter.blank_line()
    }

    /// Builds the client image, runs the tool against both endpoints, and
    /// returns its stdout followed by any stderr. Failures of either step
    /// show up only in the returned text.
    pub fn run_diff<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
        source: &Endpoint,
        target: &Endpoint,
        schema: &str,
        options: &str,
    ) -> anyhow::Result<String> {
        let invocation =
            DiffInvocation::new(&self.config, source, target, schema, options, self.dsn_mode);
        let command_line = invocation.command_line();
        presenter.narrate(&format!("Running mydiff: {command_line}"))?;
        presenter.blank_line()?;
        demo_log::info(module_path!(), format!("running diff: {command_line}"));

        let build = image_build_request(&self.config);
        let built = self.processes.run(&build)?;
        log_exit(&build.command_line(), &built);
        let image = built.stdout.trim();
        if image.is_empty() {
            demo_log::warn(module_path!(), "image build produced no image id");
            return Ok(built.stderr);
        }

        let container_command = invocation.container_command(&self.config, image);
        let run = ProcessRequest::new("sh")
            .args(["-c".to_string(), container_command])
            .stdin(if self.config.tty {
                StdinSource::Inherit
            } else {
                StdinSource::Null
            });
        let output = self.processes.run(&run)?;
        log_exit(&command_line, &output);

        let mut text = output.stdout;
        text.push_str(&output.stderr);
        Ok(text)
    }
}

fn log_exit(command_line: &str, output: &ProcessOutput) {
    if output.success() {
        demo_log::debug(module_path!(), format!("exit 0: {command_line}"));
        return;
    }
    let status = match output.code {
        Some(code) => format!("exit {code}"),
        None => "terminated by signal".to_string(),
    };
    demo_log::warn(module_path!(), format!("{status}: {command_line}"));
}

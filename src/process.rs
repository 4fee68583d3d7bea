use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::demo_log;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StdinSource {
    /// Shares the operator's terminal, needed for `docker run -it`.
    Inherit,
    Null,
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: StdinSource,
}

impl ProcessRequest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: StdinSource::Null,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = stdin;
        self
    }

    /// Shell-like rendering for narration and logs; not used for execution.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./:=@,+".contains(ch));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one external process to completion. Failing to start the process is
/// an error; a non-zero exit is reported through [`ProcessOutput::code`].
pub trait ProcessRunner {
    fn run(&mut self, request: &ProcessRequest) -> anyhow::Result<ProcessOutput>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&mut self, request: &ProcessRequest) -> anyhow::Result<ProcessOutput> {
        if demo_log::enabled(demo_log::Level::Trace) {
            demo_log::trace(module_path!(), format!("spawn: {}", request.command_line()));
        }
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command.stdin(match request.stdin {
            StdinSource::Inherit => Stdio::inherit(),
            StdinSource::Null => Stdio::null(),
            StdinSource::Bytes(_) => Stdio::piped(),
        });

        let mut child = command
            .spawn()
            .with_context(|| format!("unable to start {}", request.program))?;

        let output = match (&request.stdin, child.stdin.take()) {
            (StdinSource::Bytes(bytes), Some(mut stdin)) => std::thread::scope(|scope| {
                // The writer must not block the stdout/stderr drain.
                let writer = scope.spawn(move || {
                    let _ = stdin.write_all(bytes);
                });
                let output = child.wait_with_output();
                let _ = writer.join();
                output
            }),
            _ => child.wait_with_output(),
        }
        .with_context(|| format!("unable to wait for {}", request.program))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

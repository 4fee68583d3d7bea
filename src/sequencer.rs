use crate::commands::CommandRunner;
use crate::demo_log;
use crate::presenter::Presenter;
use crate::process::ProcessRunner;
use crate::script::{Action, DemoScript, Step, render_text};

/// Runs a [`DemoScript`] one step at a time, in declaration order. There is
/// no retry or skip: the first error stops the run and later steps never
/// execute.
pub struct Sequencer<P, R> {
    presenter: P,
    commands: CommandRunner<R>,
    show_banner: bool,
    completed: usize,
}

impl<P: Presenter, R: ProcessRunner> Sequencer<P, R> {
    pub fn new(presenter: P, commands: CommandRunner<R>) -> Self {
        Self {
            presenter,
            commands,
            show_banner: true,
            completed: 0,
        }
    }

    pub fn show_banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// Number of steps that ran to completion.
    pub fn completed_steps(&self) -> usize {
        self.completed
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn commands(&self) -> &CommandRunner<R> {
        &self.commands
    }

    pub fn run(&mut self, script: &DemoScript) -> anyhow::Result<()> {
        let mode = self
            .commands
            .config()
            .dsn_schema
            .unwrap_or(script.dsn_schema);
        self.commands.set_dsn_mode(mode);
        self.completed = 0;
        demo_log::info(
            module_path!(),
            format!(
                "script {} started: {} steps, dsn schema {:?}",
                script.name,
                script.steps.len(),
                mode
            ),
        );

        if self.show_banner
            && let Some(banner) = &script.banner
        {
            self.presenter.echo(banner)?;
        }

        for (index, step) in script.steps.iter().enumerate() {
            if let Err(err) = self.run_step(index, step) {
                demo_log::error(
                    module_path!(),
                    format!("script {} stopped at step {}: {err:#}", script.name, index + 1),
                );
                return Err(err);
            }
            self.completed = index + 1;
        }

        if let Some(outro) = &script.outro {
            let outro = render_text(outro, self.commands.config());
            self.presenter.narrate(&outro)?;
        }
        demo_log::info(module_path!(), format!("script {} finished", script.name));
        Ok(())
    }

    fn run_step(&mut self, index: usize, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Demo { title, actions } => {
                let title = render_text(title, self.commands.config());
                demo_log::info(module_path!(), format!("step {}: {title}", index + 1));
                self.presenter.announce_section(&title)?;
                for action in actions {
                    self.run_action(action)?;
                }
                Ok(())
            }
            Step::Wait { prompt } => {
                demo_log::debug(module_path!(), format!("step {}: wait", index + 1));
                self.presenter.pause(prompt.as_deref())
            }
        }
    }

    fn run_action(&mut self, action: &Action) -> anyhow::Result<()> {
        match action {
            Action::Load { file, server } => {
                let endpoint = server.endpoint(self.commands.config()).clone();
                self.commands
                    .load_fixture(&mut self.presenter, file, &endpoint)
            }
            Action::Diff(options) => {
                let config = self.commands.config();
                let (source, target) = (config.server1.clone(), config.server2.clone());
                let schema = config.schema.clone();
                let output = self.commands.run_diff(
                    &mut self.presenter,
                    &source,
                    &target,
                    &schema,
                    options,
                )?;
                self.presenter.echo(&output)
            }
            Action::Wait(prompt) => self.presenter.pause(prompt.as_deref()),
            Action::Say(message) => {
                let message = render_text(message, self.commands.config());
                self.presenter.narrate(&message)
            }
        }
    }
}

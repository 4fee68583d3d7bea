use std::{
    error::Error,
    fmt,
    io::{self, BufRead, Write},
};

use anyhow::Context;

use crate::style::{Style, style};

pub const DEFAULT_PAUSE_PROMPT: &str = "Press ENTER to continue";

/// Raised when the operator's input stream ends during a wait.
#[derive(Debug)]
pub struct InputClosed;

impl fmt::Display for InputClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operator input closed while waiting to continue")
    }
}

impl Error for InputClosed {}

/// Operator-facing output plus the wait-for-input gate.
pub trait Presenter {
    /// Banner surrounded by blank lines.
    fn announce_section(&mut self, title: &str) -> anyhow::Result<()>;
    /// `> message`, the system speaking.
    fn narrate(&mut self, message: &str) -> anyhow::Result<()>;
    /// A line addressed to the operator.
    fn prompt(&mut self, message: &str) -> anyhow::Result<()>;
    /// Unstyled text such as fixture contents or tool output.
    fn echo(&mut self, text: &str) -> anyhow::Result<()>;
    fn blank_line(&mut self) -> anyhow::Result<()>;
    /// Prompts, flushes, then blocks until one line of input arrives.
    /// The line's content is ignored. End of input yields [`InputClosed`].
    fn pause(&mut self, message: Option<&str>) -> anyhow::Result<()>;
}

pub struct ConsolePresenter<W, R> {
    out: W,
    input: R,
}

impl ConsolePresenter<io::Stdout, io::StdinLock<'static>> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stdin().lock())
    }
}

impl<W: Write, R: BufRead> ConsolePresenter<W, R> {
    pub fn new(out: W, input: R) -> Self {
        Self { out, input }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}").context("write to console")
    }
}

impl<W: Write, R: BufRead> Presenter for ConsolePresenter<W, R> {
    fn announce_section(&mut self, title: &str) -> anyhow::Result<()> {
        self.blank_line()?;
        self.line(&style(&format!(" {title} "), Style::Highlight))?;
        self.blank_line()
    }

    fn narrate(&mut self, message: &str) -> anyhow::Result<()> {
        self.line(&style(&format!("> {message}"), Style::Narration))
    }

    fn prompt(&mut self, message: &str) -> anyhow::Result<()> {
        self.line(&style(message, Style::Prompt))
    }

    fn echo(&mut self, text: &str) -> anyhow::Result<()> {
        if text.ends_with('\n') {
            write!(self.out, "{text}").context("write to console")
        } else {
            self.line(text)
        }
    }

    fn blank_line(&mut self) -> anyhow::Result<()> {
        self.line("")
    }

    fn pause(&mut self, message: Option<&str>) -> anyhow::Result<()> {
        self.blank_line()?;
        self.prompt(message.unwrap_or(DEFAULT_PAUSE_PROMPT))?;
        self.out.flush().context("flush console")?;
        let mut line = Vec::new();
        let read = self
            .input
            .read_until(b'\n', &mut line)
            .context("read operator input")?;
        if read == 0 {
            return Err(InputClosed.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn presenter(input: &str) -> ConsolePresenter<Vec<u8>, Cursor<Vec<u8>>> {
        ConsolePresenter::new(Vec::new(), Cursor::new(input.as_bytes().to_vec()))
    }

    fn rendered(presenter: &ConsolePresenter<Vec<u8>, Cursor<Vec<u8>>>) -> String {
        String::from_utf8_lossy(presenter.output()).to_string()
    }

    #[test]
    fn section_banner_has_surrounding_blank_lines() {
        let mut presenter = presenter("");
        presenter.announce_section("Welcome").unwrap();
        let text = rendered(&presenter);
        assert!(text.starts_with('\n'));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains(" Welcome "));

        presenter.narrate("Running mydiff").unwrap();
        assert!(rendered(&presenter).contains("> Running mydiff"));
    }

    #[test]
    fn echo_does_not_double_newlines() {
        let mut presenter = presenter("");
        presenter.echo("CREATE TABLE a (id int);\n").unwrap();
        presenter.echo("done").unwrap();
        assert_eq!(rendered(&presenter), "CREATE TABLE a (id int);\ndone\n");
    }

    #[test]
    fn pause_consumes_one_line_per_call() {
        let mut presenter = presenter("\nanything\n");
        presenter.pause(None).unwrap();
        presenter.pause(Some("Ready?")).unwrap();
        let err = presenter.pause(None).unwrap_err();
        assert!(err.downcast_ref::<InputClosed>().is_some());
        let text = rendered(&presenter);
        assert_eq!(text.matches(DEFAULT_PAUSE_PROMPT).count(), 2);
        assert!(text.contains("Ready?"));
    }

    #[test]
    fn pause_ignores_non_utf8_input() {
        let mut presenter =
            ConsolePresenter::new(Vec::new(), Cursor::new(vec![0xe9, b'\n', 0xff]));
        presenter.pause(None).unwrap();
        presenter.pause(None).unwrap();
        let err = presenter.pause(None).unwrap_err();
        assert!(err.downcast_ref::<InputClosed>().is_some());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn output_failures_are_errors() {
        let mut presenter = ConsolePresenter::new(BrokenPipe, Cursor::new(b"\n".to_vec()));
        assert!(presenter.narrate("x").is_err());
        assert!(presenter.announce_section("title").is_err());
        let err = presenter.pause(None).unwrap_err();
        assert!(format!("{err:#}").contains("closed"));
    }
}

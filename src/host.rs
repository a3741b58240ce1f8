use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

/// Output channels of the `out` built-ins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Info,
    Warn,
    Error,
}

/// The world outside the interpreter: where output lines go and where input
/// lines come from.
///
/// Every call is synchronous; the evaluator blocks on it.
pub trait Host {
    /// Writes one line. The line never contains the terminating newline.
    fn write_line(&mut self, channel: Channel, line: &str) -> io::Result<()>;

    /// Shows `prompt` and reads one line, without its line terminator.
    /// Returns `None` once the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Receives `[ENV]` lines while the `@debug` pragma is on.
    fn trace(&mut self, line: &str);
}

/// Host backed by the process' standard streams.
///
/// Info lines go to stdout. Warnings and errors go to stderr, prefixed with
/// `[WARN] ` and `[ERROR] `.
#[derive(Debug, Default)]
pub struct StdHost;

impl Host for StdHost {
    fn write_line(&mut self, channel: Channel, line: &str) -> io::Result<()> {
        match channel {
            Channel::Info => writeln!(io::stdout().lock(), "{line}"),
            Channel::Warn => writeln!(io::stderr().lock(), "[WARN] {line}"),
            Channel::Error => writeln!(io::stderr().lock(), "[ERROR] {line}"),
        }
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut buf = String::new();
        if io::stdin().lock().read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        let len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(len);
        Ok(Some(buf))
    }

    fn trace(&mut self, line: &str) {
        eprintln!("{line}");
    }
}

/// In-memory host. Records everything the program writes and serves input
/// from a queue.
#[derive(Debug, Default)]
pub struct BufferHost {
    pub lines: Vec<(Channel, String)>,
    pub prompts: Vec<String>,
    pub traces: Vec<String>,
    input: VecDeque<String>,
}

impl BufferHost {
    pub fn new() -> BufferHost {
        BufferHost::default()
    }

    /// Creates a host which answers input requests with `input`, in order.
    pub fn with_input<S: Into<String>>(input: impl IntoIterator<Item = S>) -> BufferHost {
        BufferHost {
            input: input.into_iter().map(Into::into).collect(),
            ..BufferHost::default()
        }
    }

    /// Lines written to `channel`, in order.
    pub fn output(&self, channel: Channel) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, line)| line.as_str())
            .collect()
    }
}

impl Host for BufferHost {
    fn write_line(&mut self, channel: Channel, line: &str) -> io::Result<()> {
        self.lines.push((channel, line.to_owned()));
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_owned());
        Ok(self.input.pop_front())
    }

    fn trace(&mut self, line: &str) {
        self.traces.push(line.to_owned());
    }
}

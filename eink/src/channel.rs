//! Transports carrying commands to the panel daemon.

use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::command::Command;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to connect to socket {0}: {1}")]
    Connect(String, #[source] io::Error),
    #[error("Channel is closed")]
    Closed,
}

/// Outbound command transport with an explicit lifecycle.
///
/// Implementations write each command as its wire token followed by a newline.
pub trait CommandChannel {
    fn open(&mut self) -> Result<(), ChannelError>;

    /// Send a batch of commands in order.
    fn send(&mut self, commands: &[Command]) -> Result<(), ChannelError>;

    fn close(&mut self) -> Result<(), ChannelError>;
}

impl<T: CommandChannel + ?Sized> CommandChannel for Box<T> {
    fn open(&mut self) -> Result<(), ChannelError> {
        (**self).open()
    }

    fn send(&mut self, commands: &[Command]) -> Result<(), ChannelError> {
        (**self).send(commands)
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        (**self).close()
    }
}

fn write_batch<W: Write>(writer: &mut W, commands: &[Command]) -> io::Result<()> {
    for command in commands {
        writeln!(writer, "{}", command)?;
    }
    writer.flush()
}

/// A call made on a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Open,
    Send(Vec<Command>),
    Close,
}

/// In-memory channel that records every call, for driving the mode
/// managers without a daemon.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Vec<ChannelCall>,
    fail_sends: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail, still recording the batch.
    pub fn failing(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn calls(&self) -> &[ChannelCall] {
        &self.calls
    }

    /// Every command sent so far, flattened across batches.
    pub fn sent(&self) -> Vec<Command> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Send(batch) => Some(batch.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Wire tokens sent so far.
    pub fn sent_wire(&self) -> Vec<String> {
        self.sent().iter().map(Command::to_string).collect()
    }

    /// Drain the recorded commands, leaving the call log empty.
    pub fn take_sent(&mut self) -> Vec<Command> {
        let sent = self.sent();
        self.calls.clear();
        sent
    }
}

impl CommandChannel for RecordingChannel {
    fn open(&mut self) -> Result<(), ChannelError> {
        self.calls.push(ChannelCall::Open);
        Ok(())
    }

    fn send(&mut self, commands: &[Command]) -> Result<(), ChannelError> {
        self.calls.push(ChannelCall::Send(commands.to_vec()));
        if self.fail_sends {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.calls.push(ChannelCall::Close);
        Ok(())
    }
}

/// Channel over any byte sink: stdout, a FIFO, a file.
pub struct WriterChannel<W: Write> {
    writer: W,
    open: bool,
}

impl<W: Write> WriterChannel<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterChannel<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CommandChannel for WriterChannel<W> {
    fn open(&mut self) -> Result<(), ChannelError> {
        self.open = true;
        Ok(())
    }

    fn send(&mut self, commands: &[Command]) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        write_batch(&mut self.writer, commands)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        if self.open {
            self.open = false;
            self.writer.flush()?;
        }
        Ok(())
    }
}

/// Channel over the daemon's Unix domain socket.
///
/// A path starting with `@` names a Linux abstract socket. A failed write
/// reconnects and retries the command once before giving up.
///
/// `open` keeps retrying the first connection until the daemon accepts it or
/// the connect timeout runs out. The default timeout of zero tries once.
pub struct UnixSocketChannel {
    path: PathBuf,
    stream: Option<UnixStream>,
    connect_timeout: Duration,
    retry_interval: Duration,
}

impl UnixSocketChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
            connect_timeout: Duration::ZERO,
            retry_interval: Duration::from_millis(100),
        }
    }

    /// Wait up to `timeout` for the daemon on `open`, retrying every `interval`.
    pub fn with_connect_timeout(mut self, timeout: Duration, interval: Duration) -> Self {
        self.connect_timeout = timeout;
        self.retry_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<&mut UnixStream, ChannelError> {
        let stream = connect_socket(&self.path)
            .map_err(|e| ChannelError::Connect(self.path.display().to_string(), e))?;
        tracing::debug!("Connected to command socket {}", self.path.display());
        Ok(self.stream.insert(stream))
    }

    /// Connect, retrying until the daemon accepts or the deadline passes.
    fn connect_with_retry(&mut self) -> Result<(), ChannelError> {
        let deadline = Instant::now() + self.connect_timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match connect_socket(&self.path) {
                Ok(stream) => {
                    tracing::debug!(attempts, "Connected to command socket {}", self.path.display());
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) if Instant::now() + self.retry_interval <= deadline => {
                    tracing::debug!(attempts, "Daemon not accepting yet: {}", e);
                    thread::sleep(self.retry_interval);
                }
                Err(e) => {
                    return Err(ChannelError::Connect(self.path.display().to_string(), e));
                }
            }
        }
    }

    fn write_command(&mut self, command: &Command) -> Result<(), ChannelError> {
        let line = format!("{}\n", command);
        let result = match self.stream.as_mut() {
            Some(stream) => write_line(stream, &line),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        };

        if let Err(e) = result {
            tracing::warn!("Write of {} failed ({}), reconnecting", command, e);
            self.disconnect();
            let stream = self.connect()?;
            if let Err(e) = write_line(stream, &line) {
                self.disconnect();
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

fn write_line(stream: &mut UnixStream, line: &str) -> io::Result<()> {
    stream.write_all(line.as_bytes())?;
    stream.flush()
}

#[cfg(target_os = "linux")]
fn connect_socket(path: &Path) -> io::Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    match path.to_str().and_then(|p| p.strip_prefix('@')) {
        Some(name) => UnixStream::connect_addr(&SocketAddr::from_abstract_name(name)?),
        None => UnixStream::connect(path),
    }
}

#[cfg(not(target_os = "linux"))]
fn connect_socket(path: &Path) -> io::Result<UnixStream> {
    UnixStream::connect(path)
}

impl CommandChannel for UnixSocketChannel {
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn open(&mut self) -> Result<(), ChannelError> {
        self.connect_with_retry()
    }

    fn send(&mut self, commands: &[Command]) -> Result<(), ChannelError> {
        for command in commands {
            self.write_command(command)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.disconnect();
        Ok(())
    }
}

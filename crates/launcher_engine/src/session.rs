use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use launcher_logging::{launch_debug, launch_info, launch_warn};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;

use crate::EngineEvent;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open pty: {0}")]
    Open(String),
    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("session write failed: {0}")]
    Write(#[from] io::Error),
    #[error("resize failed: {0}")]
    Resize(String),
    #[error("session already disposed")]
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub rows: u16,
    pub cols: u16,
}

impl SessionConfig {
    /// Interactive shell for the host: PowerShell on Windows, bash elsewhere.
    pub fn interactive_shell(rows: u16, cols: u16) -> Self {
        let program = if cfg!(windows) { "powershell.exe" } else { "bash" };
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            rows,
            cols,
        }
    }
}

/// One shell in a pseudo-terminal. Output is forwarded as
/// [`EngineEvent::Output`] from a reader thread.
pub struct PtySession {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    reader_thread: Option<JoinHandle<()>>,
    disposed: bool,
}

impl std::fmt::Debug for PtySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySession")
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn size(rows: u16, cols: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

impl PtySession {
    pub fn spawn(config: SessionConfig, events: Sender<EngineEvent>) -> Result<Self, SessionError> {
        let mut cmd = CommandBuilder::new(&config.program);
        cmd.args(&config.args);
        if let Some(cwd) = &config.cwd {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", "xterm-256color");

        let pair = portable_pty::native_pty_system()
            .openpty(size(config.rows, config.cols))
            .map_err(|err| SessionError::Open(err.to_string()))?;
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|err| SessionError::Spawn {
                program: config.program.clone(),
                message: err.to_string(),
            })?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| SessionError::Open(err.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| SessionError::Open(err.to_string()))?;

        let reader_thread = thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || forward_output(reader, events))
            .map_err(|err| SessionError::Open(err.to_string()))?;
        launch_info!(
            "session started: {} {}x{}",
            config.program,
            config.cols,
            config.rows
        );

        Ok(Self {
            master: pair.master,
            writer,
            child,
            reader_thread: Some(reader_thread),
            disposed: false,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        self.master
            .resize(size(rows, cols))
            .map_err(|err| SessionError::Resize(err.to_string()))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Kills the shell. The reader thread ends on its own once the pty closes.
    pub fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        if let Ok(Some(status)) = self.child.try_wait() {
            launch_debug!("shell already exited: {:?}", status);
        } else if let Err(err) = self.child.kill() {
            launch_warn!("failed to kill shell: {}", err);
        }
        drop(self.reader_thread.take());
        launch_info!("session disposed");
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn forward_output(mut reader: Box<dyn Read + Send>, events: Sender<EngineEvent>) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if events.send(EngineEvent::Output(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                launch_debug!("pty read ended: {}", err);
                break;
            }
        }
    }
    let _ = events.send(EngineEvent::SessionClosed);
}

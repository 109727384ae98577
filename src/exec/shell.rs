// src/exec/shell.rs

//! Launching a command through the shell with stdout and stderr merged
//! onto one pipe.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, BufReader};
use tokio::process::{Child, Command as ProcessCommand};

use crate::command::Command;

/// Combined stdout+stderr of a child, read in production order.
pub type CombinedOutput = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Shell used to interpret command strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub program: String,
    pub flag: String,
}

impl Shell {
    pub fn new(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        if cfg!(windows) {
            Shell::new("cmd", "/C")
        } else {
            Shell::new("sh", "-c")
        }
    }
}

/// Spawn `command` under `shell`.
///
/// Both output channels of the child share the write end of a single pipe,
/// so lines written to stdout and stderr come out in the order the process
/// produced them. On Unix the child leads its own process group so that a
/// terminate request reaches everything the shell started.
pub fn spawn_combined(shell: &Shell, command: &Command) -> io::Result<(Child, CombinedOutput)> {
    let (reader, writer) = io::pipe()?;

    let child = {
        let mut cmd = ProcessCommand::new(&shell.program);
        cmd.arg(&shell.flag)
            .arg(command.as_str())
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        // `cmd` drops at the end of this block and takes the parent's copies
        // of the write end with it; EOF on `reader` then means every process
        // in the child tree has closed it.
        cmd.spawn()?
    };

    Ok((child, BufReader::new(into_async_reader(reader)?)))
}

#[cfg(unix)]
fn into_async_reader(reader: io::PipeReader) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let receiver = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok(Box::new(receiver))
}

#[cfg(windows)]
fn into_async_reader(reader: io::PipeReader) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
    use std::os::windows::io::OwnedHandle;

    let file = std::fs::File::from(OwnedHandle::from(reader));
    Ok(Box::new(tokio::fs::File::from_std(file)))
}

/// Decode one raw line: drop the terminator, replace invalid UTF-8.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

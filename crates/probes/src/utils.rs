use crate::Error;
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
    process::{Command, Stdio},
};

/// Split an `ss` local address column into host and port.
///
/// Wildcard ports (`*`) are reported as port `0`, IPv6 brackets and
/// interface zones (`%lo`) are stripped.
///
/// ```
/// # use probes::utils::split_host_port;
/// assert_eq!(split_host_port("0.0.0.0:22"), Some(("0.0.0.0".into(), 22)));
/// assert_eq!(split_host_port("[::]:443"), Some(("::".into(), 443)));
/// assert_eq!(split_host_port("127.0.0.53%lo:53"), Some(("127.0.0.53".into(), 53)));
/// assert_eq!(split_host_port("*:*"), Some(("*".into(), 0)));
/// assert_eq!(split_host_port("garbage"), None);
/// ```
pub fn split_host_port(local: &str) -> Option<(String, u16)> {
    let local = local.trim();
    if local == "*:*" {
        return Some(("*".into(), 0));
    }
    let (host, port) = if let Some(rest) = local.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        (host, port)
    } else {
        local.rsplit_once(':')?
    };
    let port = if port == "*" { 0 } else { port.parse().ok()? };
    let host = host.split_once('%').map_or(host, |(host, _zone)| host);
    Some((host.to_string(), port))
}

/// Read at most the last `max_bytes` of a file as lossy UTF-8 lines.
///
/// The first line is dropped when the read starts mid-file, since it is
/// almost certainly truncated.
pub fn tail_lines(path: &Path, max_bytes: u64) -> Result<Vec<String>, Error> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let start = size.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::with_capacity((size - start) as usize);
    file.read_to_end(&mut buf)?;

    let text = String::from_utf8_lossy(&buf);
    let skip = usize::from(start > 0);
    Ok(text.lines().skip(skip).map(str::to_owned).collect())
}

/// Captured result of an external tool.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run a tool to completion with a neutral locale so its output parses the
/// same everywhere. A non-zero exit status is not an error.
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandOutput, Error> {
    let output = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::CommandFailed {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

//! Helpers intended for [`std::process::Command`].

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};

/// The result of a child process whose stdout and stderr were captured
/// through a single pipe, so the two streams are interleaved in the order
/// the child wrote them.
#[derive(Debug)]
pub struct CombinedOutput {
    /// How the child exited.
    pub status: ExitStatus,
    /// Everything the child wrote to stdout and stderr.
    pub output: Vec<u8>,
}

impl CombinedOutput {
    /// The captured output as (lossily decoded) text.
    pub fn output_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }

    /// The exit code, or -1 if the child was killed by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Helpers intended for [`std::process::Command`].
pub trait CommandRunExt {
    /// Log (at debug level) the full child commandline.
    fn log_debug(&mut self) -> &mut Self;

    /// Spawn the child with stdout and stderr sharing one pipe, wait for it,
    /// and return what it wrote. A non-zero exit is *not* an error here;
    /// inspect [`CombinedOutput::status`].
    fn output_combined(&mut self) -> Result<CombinedOutput>;

    /// Render the program and its arguments as a shell-quoted string.
    fn to_string_pretty(&self) -> String;
}

impl CommandRunExt for Command {
    fn log_debug(&mut self) -> &mut Self {
        tracing::debug!("exec: {}", self.to_string_pretty());
        self
    }

    fn output_combined(&mut self) -> Result<CombinedOutput> {
        let (mut reader, writer) = std::io::pipe().context("Creating pipe")?;
        let writer2 = writer.try_clone().context("Cloning pipe")?;
        let mut child = self
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer2)
            .spawn()
            .with_context(|| format!("Spawning {}", self.to_string_pretty()))?;
        // The command keeps its configured stdio alive; release our copies of
        // the write end so reading below sees EOF once the child exits.
        self.stdout(Stdio::null()).stderr(Stdio::null());

        let mut output = Vec::new();
        let read_result = reader.read_to_end(&mut output);
        let status = child.wait().context("Waiting for child")?;
        read_result.context("Reading child output")?;
        Ok(CombinedOutput { status, output })
    }

    fn to_string_pretty(&self) -> String {
        let words = std::iter::once(self.get_program())
            .chain(self.get_args())
            .map(|w| w.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        shlex::try_join(words.iter().map(|s| s.as_str()))
            .unwrap_or_else(|_| words.join(" "))
    }
}

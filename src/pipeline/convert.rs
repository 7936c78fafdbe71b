use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::config::ConvertSettings;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to launch {binary}: {source}")]
    Spawn { binary: PathBuf, source: io::Error },

    #[error("encoder exited with {0}")]
    Status(ExitStatus),

    #[error("encoder reported success but wrote no output")]
    NoOutput,
}

/// Opaque down-conversion capability.
///
/// Implementations run synchronously; the pipeline supplies the threads.
pub trait Encoder: Send + Sync {
    fn convert(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<(), ConvertError>;
}

/// Runs the LAME command-line encoder: `lame -b <kbps> --silent in out`.
#[derive(Debug, Clone)]
pub struct LameEncoder {
    binary: PathBuf,
}

impl LameEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Encoder for LameEncoder {
    fn convert(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<(), ConvertError> {
        debug!(input = %input.display(), output = %output.display(), bitrate_kbps, "running lame");

        let status = Command::new(&self.binary)
            .arg("-b")
            .arg(bitrate_kbps.to_string())
            .arg("--silent")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ConvertError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ConvertError::Status(status));
        }
        if !output.is_file() {
            return Err(ConvertError::NoOutput);
        }
        Ok(())
    }
}

/// Encoder plus the settings deciding which tracks go through it.
#[derive(Clone)]
pub struct Conversion {
    pub encoder: std::sync::Arc<dyn Encoder>,
    pub settings: ConvertSettings,
}

impl Conversion {
    pub fn applies_to(&self, source: &Path) -> bool {
        self.settings.is_convertible(source)
    }
}

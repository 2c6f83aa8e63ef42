/*!
 * Speech-to-text engine handle.
 *
 * The caption core never talks to an engine; this module is the glue that runs
 * one and hands its raw JSON to the transcription normalizer. Readiness is an
 * explicit, once-initialized property of a handle rather than global state:
 * `ensure_ready` resolves the executable and checks the model the first time it
 * succeeds, and is a no-op afterwards.
 */

use async_trait::async_trait;
use log::{debug, error, info};
use serde_json::Value;
use std::ffi::OsString;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::app_config::EngineConfig;
use crate::errors::EngineError;

/// Common trait for speech-to-text engines
#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    /// Prepare the engine; calling it again after success does nothing
    async fn ensure_ready(&self) -> Result<(), EngineError>;

    /// Transcribe a media file and return the engine's raw JSON output
    async fn transcribe(&self, media_path: &Path) -> Result<Value, EngineError>;
}

/// whisper.cpp command line engine
#[derive(Debug)]
pub struct WhisperCppEngine {
    config: EngineConfig,
    binary: OnceCell<PathBuf>,
}

impl WhisperCppEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            binary: OnceCell::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.binary.initialized()
    }

    async fn prepare(&self) -> Result<PathBuf, EngineError> {
        let binary = resolve_binary(&self.config.binary_path)
            .ok_or_else(|| EngineError::BinaryNotFound(self.config.binary_path.clone()))?;

        if !Path::new(&self.config.model_path).is_file() {
            return Err(EngineError::ModelNotFound(self.config.model_path.clone()));
        }

        info!("Transcription engine ready: {}", binary.display());
        Ok(binary)
    }

    fn build_command(&self, binary: &Path, media_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(binary);
        cmd.arg("-m").arg(&self.config.model_path)
            .arg("-f").arg(media_path)
            .arg("--output-json-full")
            .arg("--output-file").arg(output_base)
            .arg("--no-prints");

        if let Some(language) = &self.config.language {
            cmd.arg("-l").arg(language);
        }
        cmd.args(&self.config.extra_args);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcriber for WhisperCppEngine {
    async fn ensure_ready(&self) -> Result<(), EngineError> {
        self.binary.get_or_try_init(|| self.prepare()).await?;
        Ok(())
    }

    async fn transcribe(&self, media_path: &Path) -> Result<Value, EngineError> {
        self.ensure_ready().await?;
        let binary = self
            .binary
            .get()
            .ok_or_else(|| EngineError::BinaryNotFound(self.config.binary_path.clone()))?;

        if !media_path.is_file() {
            return Err(EngineError::ProcessFailed(format!("Input file does not exist: {:?}", media_path)));
        }

        // Scratch directory is removed when `scratch` drops, on every path out
        let scratch = tempfile::Builder::new()
            .prefix("quill-whisper-")
            .tempdir()
            .map_err(|e| EngineError::OutputUnreadable(format!("Failed to create scratch directory: {}", e)))?;
        let output_base = scratch.path().join("transcript");

        debug!("Running {} on {:?}", binary.display(), media_path);
        let mut command = self.build_command(binary, media_path, &output_base);
        let engine_future = command.output();

        let timeout_secs = self.config.timeout_secs;
        let output = tokio::select! {
            result = engine_future => {
                result.map_err(|e| EngineError::ProcessFailed(format!("Failed to execute engine: {}", e)))?
            },
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                return Err(EngineError::Timeout(timeout_secs));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(500).collect();
            error!("Transcription failed: {}", excerpt);
            return Err(EngineError::ProcessFailed(format!("{}: {}", output.status, excerpt)));
        }

        let json_path = output_base.with_extension("json");
        let content = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| EngineError::OutputUnreadable(format!("{}: {}", json_path.display(), e)))?;

        serde_json::from_str(&content).map_err(|e| EngineError::OutputUnreadable(e.to_string()))
    }
}

/// Resolve an executable given as a path, or as a bare name searched in PATH
///
/// Only executable files match, so a stray non-executable file earlier in PATH
/// does not shadow the real engine.
fn resolve_binary(binary: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    resolve_binary_in(binary, std::env::var_os("PATH"), &cwd)
}

fn resolve_binary_in(binary: &str, search_path: Option<OsString>, cwd: &Path) -> Option<PathBuf> {
    which::which_in(binary, search_path, cwd).ok()
}

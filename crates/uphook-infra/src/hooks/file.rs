use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use uphook_core::{HookCodec, HookConfig, HookError, HookRequest, HookResponse, JsonCodec};

use super::HookHandler;

/// Runs `<directory>/<hook-type>` for every hook.
///
/// The JSON request is written to the executable's stdin and the JSON
/// response read from its stdout. `TUS_ID`, `TUS_SIZE` and `TUS_OFFSET` are
/// set in its environment and it runs inside `directory`. Hook types
/// without an executable proceed.
pub struct FileHook {
    directory: PathBuf,
    codec: JsonCodec,
}

impl FileHook {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        // Executables are spawned inside the directory, so a relative
        // program path would be ambiguous
        let directory = std::path::absolute(&directory).unwrap_or(directory);
        Self {
            directory,
            codec: JsonCodec,
        }
    }

    pub fn from_config(config: &HookConfig) -> anyhow::Result<Self> {
        let directory = config.hooks_dir.clone().context("HOOKS_DIR must be set")?;
        Ok(Self::new(directory))
    }
}

#[async_trait]
impl HookHandler for FileHook {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn setup(&self) -> anyhow::Result<()> {
        let metadata = tokio::fs::metadata(&self.directory).await.with_context(|| {
            format!(
                "Hooks directory {} is not accessible",
                self.directory.display()
            )
        })?;
        if !metadata.is_dir() {
            anyhow::bail!("Hooks path {} is not a directory", self.directory.display());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(hook_type = %request.hook_type()))]
    async fn invoke_hook(&self, request: &HookRequest) -> Result<HookResponse, HookError> {
        let path = self.directory.join(request.hook_type().as_str());
        let payload = self
            .codec
            .encode_request(request)
            .map_err(|e| HookError::Encode(e.to_string()))?;
        let upload = request.upload();

        let spawned = Command::new(&path)
            .current_dir(&self.directory)
            .env("TUS_ID", &upload.id)
            .env("TUS_SIZE", upload.size.unwrap_or(0).to_string())
            .env("TUS_OFFSET", upload.offset.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "No hook executable, proceeding");
                return Ok(HookResponse::default());
            }
            Err(e) => {
                return Err(HookError::HandlerError(format!(
                    "failed to run {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            // Executables may exit without reading their input
            if let Err(e) = stdin.write_all(&payload).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(HookError::HandlerError(format!(
                        "failed to write hook request: {}",
                        e
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| HookError::HandlerError(format!("failed to wait for hook: {}", e)))?;

        if !output.status.success() {
            return Err(HookError::HandlerError(format!(
                "{} exited with {}",
                path.display(),
                output.status
            )));
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(HookResponse::default());
        }

        self.codec
            .decode_response(&output.stdout)
            .map_err(|e| HookError::MalformedResponse(e.to_string()))
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! External renderer orchestration.
//!
//! Writes a notation document to `<id>.ly`, runs the typesetting program
//! against it under a hard timeout, and locates the files it produced.
//! The renderer is allowed to name its outputs loosely, so a missing
//! predicted file falls back to a directory scan for the session id.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::RendererConfig;
use crate::error::{Error, Result};

/// Extension of generated source documents
pub const SOURCE_EXTENSION: &str = "ly";

/// Kind of rendered output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArtifactKind {
    /// Typeset score; required
    Score,
    /// Performance (MIDI) file; optional
    PerformanceFile,
}

/// A verified output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderArtifact {
    pub kind: ArtifactKind,
    /// Path relative to the output directory
    pub relative_path: PathBuf,
    pub size_bytes: u64,
}

/// Runs the external renderer and resolves its artifacts
#[derive(Debug, Clone)]
pub struct RenderOrchestrator {
    executable: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
    score_extension: String,
    performance_extension: String,
}

impl RenderOrchestrator {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            executable: PathBuf::from(&config.executable),
            output_dir: config.output_dir.clone(),
            timeout: config.timeout(),
            score_extension: config.score_extension.clone(),
            performance_extension: config.performance_extension.clone(),
        }
    }

    /// Use a different renderer program
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Where the source document for `id` is written
    pub fn source_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", id, SOURCE_EXTENSION))
    }

    /// Absolute path of an artifact
    pub fn artifact_path(&self, artifact: &RenderArtifact) -> PathBuf {
        self.output_dir.join(&artifact.relative_path)
    }

    /// Render `document` for session `id`.
    ///
    /// Returns the score artifact followed by the performance file when
    /// one was produced.
    pub async fn render(&self, document: &str, id: &str) -> Result<Vec<RenderArtifact>> {
        validate_id(id)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await?;

        let source = output_dir.join(format!("{}.{}", id, SOURCE_EXTENSION));
        tokio::fs::write(&source, document).await?;
        debug!("Wrote notation source to {}", source.display());

        self.run(&output_dir, &source).await?;

        let score = self
            .resolve(&output_dir, id, &self.score_extension)
            .await?
            .ok_or_else(|| {
                warn!("Renderer succeeded but no {} was found for {}", self.score_extension, id);
                Error::ArtifactMissing(format!("{}.{}", id, self.score_extension))
            })?;

        let mut artifacts = vec![self.artifact(ArtifactKind::Score, &output_dir, score).await?];

        match self.resolve(&output_dir, id, &self.performance_extension).await? {
            Some(file_name) => artifacts.push(
                self.artifact(ArtifactKind::PerformanceFile, &output_dir, file_name)
                    .await?,
            ),
            None => info!("No {} generated for {}", self.performance_extension, id),
        }

        info!("Rendered {} artifacts for {}", artifacts.len(), id);
        Ok(artifacts)
    }

    /// Run the renderer to completion, killing it on timeout.
    ///
    /// One deadline covers both the process and the draining of its
    /// output.
    async fn run(&self, output_dir: &Path, source: &Path) -> Result<()> {
        info!(
            "Executing {} for {}",
            self.executable.display(),
            source.display()
        );

        let mut command = Command::new(&self.executable);
        command
            .arg(format!("--{}", self.score_extension))
            .arg(format!("--output={}", output_dir.display()))
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers the renderer starts die with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();
        let deadline = Instant::now() + self.timeout;

        let stdout = child.stdout.take().map(collect_output);
        let stderr = child.stderr.take().map(collect_output);

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "Renderer timed out after {:?}; killing pid {:?}",
                    self.timeout, pid
                );
                kill_process_group(pid);
                // kill() also reaps the child
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill renderer: {}", e);
                }
                for reader in [stdout, stderr].into_iter().flatten() {
                    reader.abort();
                }
                return Err(Error::RenderTimeout(self.timeout));
            }
        };

        // Anything left in the group would keep the pipes open
        kill_process_group(pid);

        let mut output = String::new();
        for mut reader in [stdout, stderr].into_iter().flatten() {
            match timeout_at(deadline, &mut reader).await {
                Ok(Ok(text)) => output.push_str(&text),
                Ok(Err(e)) => debug!("Renderer output reader failed: {}", e),
                Err(_) => {
                    warn!("Renderer output still open at the deadline; dropping it");
                    reader.abort();
                }
            }
        }

        if status.success() {
            debug!("Renderer output:\n{}", output);
            Ok(())
        } else {
            warn!("Renderer exited with {:?}:\n{}", status.code(), output);
            Err(Error::RenderFailed {
                exit_code: status.code(),
                output,
            })
        }
    }

    /// File name of the `extension` artifact for `id`, if any
    async fn resolve(&self, output_dir: &Path, id: &str, extension: &str) -> Result<Option<String>> {
        let predicted = format!("{}.{}", id, extension);
        if tokio::fs::try_exists(output_dir.join(&predicted)).await? {
            return Ok(Some(predicted));
        }

        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == extension)
                .unwrap_or(false);
            if !matches_extension {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.contains(id) {
                    candidates.push(name.to_string());
                }
            }
        }

        candidates.sort();
        let found = candidates.into_iter().next();
        if let Some(name) = &found {
            info!("Found alternative {} file: {}", extension, name);
        }
        Ok(found)
    }

    async fn artifact(
        &self,
        kind: ArtifactKind,
        output_dir: &Path,
        file_name: String,
    ) -> Result<RenderArtifact> {
        let metadata = tokio::fs::metadata(output_dir.join(&file_name)).await?;
        Ok(RenderArtifact {
            kind,
            relative_path: PathBuf::from(file_name),
            size_bytes: metadata.len(),
        })
    }

    /// Delete generated artifacts; files already gone are skipped.
    /// Returns how many were removed.
    pub async fn remove_artifacts(&self, artifacts: &[RenderArtifact]) -> Result<usize> {
        let mut removed = 0;
        for artifact in artifacts {
            let path = self.artifact_path(artifact);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Deleted {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

impl Default for RenderOrchestrator {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

/// A render id must name exactly one file inside the output directory
fn validate_id(id: &str) -> Result<()> {
    let mut components = Path::new(id).components();
    let single_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == id
    );
    if single_name && !id.contains(['/', '\\']) {
        Ok(())
    } else {
        warn!("Refusing to render with session id '{}'", id);
        Err(Error::InvalidSessionId(id.to_string()))
    }
}

/// SIGKILL every process in the renderer's group
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory of ours
    if unsafe { libc::killpg(pid, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("Failed to kill renderer process group {}: {}", pid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn collect_output<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    })
}

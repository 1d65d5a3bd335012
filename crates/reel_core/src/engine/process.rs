//! Engine backed by an ffmpeg toolchain running as child processes.
//!
//! The workspace is a private scratch directory; commands run with it as
//! their working directory so file names resolve inside it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::assets::{AssetFetcher, EngineAssets};
use super::errors::{EngineError, EngineResult, LoadError};
use super::types::{EngineLoader, ExecOutcome, MediaEngine, MediaInfo};
use crate::config::{EngineSettings, ToolchainSource};
use crate::workspace::validate_name;

/// Lines of engine output kept per command.
const LOG_TAIL: usize = 20;

/// Flags prepended to every runtime invocation.
const GLOBAL_FLAGS: [&str; 3] = ["-hide_banner", "-nostdin", "-y"];

/// ffmpeg/ffprobe pair operating on a private scratch directory.
pub struct ProcessEngine {
    runtime: PathBuf,
    payload: PathBuf,
    dir: PathBuf,
    scratch: Mutex<Option<TempDir>>,
    gate: tokio::sync::Mutex<()>,
    terminated: AtomicBool,
}

impl ProcessEngine {
    /// Create the scratch directory and check that the runtime starts.
    pub async fn create(
        runtime: PathBuf,
        payload: PathBuf,
        scratch_root: &Path,
    ) -> Result<Self, LoadError> {
        tokio::fs::create_dir_all(scratch_root).await.map_err(|e| {
            LoadError::init(format!(
                "cannot create scratch root {}: {}",
                scratch_root.display(),
                e
            ))
        })?;
        let scratch = tempfile::Builder::new()
            .prefix("reel-engine-")
            .tempdir_in(scratch_root)
            .map_err(|e| LoadError::init(format!("cannot create scratch directory: {}", e)))?;

        let output = Command::new(&runtime)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| LoadError::init(format!("cannot run {}: {}", runtime.display(), e)))?;
        if !output.status.success() {
            return Err(LoadError::init(format!(
                "{} -version exited with {}",
                runtime.display(),
                output.status.code().unwrap_or(-1)
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            "Engine runtime: {}",
            banner.lines().next().unwrap_or("unknown version")
        );

        let dir = scratch.path().to_path_buf();
        tracing::debug!("Engine scratch directory: {}", dir.display());

        Ok(Self {
            runtime,
            payload,
            dir,
            scratch: Mutex::new(Some(scratch)),
            gate: tokio::sync::Mutex::new(()),
            terminated: AtomicBool::new(false),
        })
    }

    /// Scratch directory backing the workspace.
    pub fn scratch_dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, name: &str) -> EngineResult<PathBuf> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(EngineError::Terminated);
        }
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.terminated.load(Ordering::SeqCst) {
            Err(EngineError::Terminated)
        } else {
            Ok(())
        }
    }
}

fn map_io(name: &str, operation: &str, e: std::io::Error) -> EngineError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EngineError::not_found(name)
    } else {
        EngineError::io(format!("{} {}", operation, name), e)
    }
}

#[async_trait]
impl MediaEngine for ProcessEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()> {
        let _gate = self.gate.lock().await;
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| EngineError::io(format!("write {}", name), e))
    }

    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        let _gate = self.gate.lock().await;
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| map_io(name, "read", e))
    }

    async fn delete_file(&self, name: &str) -> EngineResult<()> {
        let _gate = self.gate.lock().await;
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_io(name, "delete", e))
    }

    async fn exec(&self, args: &[String]) -> EngineResult<ExecOutcome> {
        let _gate = self.gate.lock().await;
        self.ensure_live()?;

        let mut child = Command::new(&self.runtime)
            .args(GLOBAL_FLAGS)
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                tool: self.runtime.display().to_string(),
                source,
            })?;

        let mut tail = VecDeque::with_capacity(LOG_TAIL);
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| EngineError::io("read engine output", e))?
            {
                tracing::debug!(target: "reel_core::engine", "{}", line);
                if tail.len() == LOG_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::io("wait for engine", e))?;

        Ok(ExecOutcome::new(
            status.code().unwrap_or(-1),
            tail.into_iter().collect(),
        ))
    }

    async fn probe(&self, name: &str) -> EngineResult<MediaInfo> {
        let _gate = self.gate.lock().await;
        let path = self.resolve(name)?;
        if !path.exists() {
            return Err(EngineError::not_found(name));
        }

        let output = Command::new(&self.payload)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                name,
            ])
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                tool: self.payload.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::parse(
                format!("probe of {}", name),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        MediaInfo::from_ffprobe_json(&output.stdout)
    }

    async fn terminate(&self) -> EngineResult<()> {
        let _gate = self.gate.lock().await;
        self.terminated.store(true, Ordering::SeqCst);
        let scratch = self.scratch.lock().take();
        if let Some(scratch) = scratch {
            let path = scratch.path().to_path_buf();
            scratch
                .close()
                .map_err(|e| EngineError::io(format!("remove {}", path.display()), e))?;
        }
        Ok(())
    }
}

/// Loads a [`ProcessEngine`] from downloaded or system executables.
pub struct ToolchainLoader {
    settings: EngineSettings,
}

impl ToolchainLoader {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    async fn fetch_remote(&self) -> Result<(PathBuf, PathBuf), LoadError> {
        let assets = EngineAssets::from_settings(&self.settings);
        let fetcher = AssetFetcher::new(self.settings.cache_path())
            .map_err(|e| LoadError::init(format!("cannot build asset client: {}", e)))?;

        let runtime = fetcher
            .fetch(&assets.runtime)
            .await
            .map_err(|e| LoadError::RuntimeFetch {
                url: assets.runtime.clone(),
                message: e.to_string(),
            })?;
        let payload = fetcher
            .fetch(&assets.payload)
            .await
            .map_err(|e| LoadError::PayloadFetch {
                url: assets.payload.clone(),
                message: e.to_string(),
            })?;

        make_executable(&runtime).await?;
        make_executable(&payload).await?;
        Ok((runtime, payload))
    }
}

#[async_trait]
impl EngineLoader for ToolchainLoader {
    async fn load(&self) -> Result<Arc<dyn MediaEngine>, LoadError> {
        let (runtime, payload) = match self.settings.source {
            ToolchainSource::Remote => self.fetch_remote().await?,
            ToolchainSource::System => (
                PathBuf::from(&self.settings.system_runtime),
                PathBuf::from(&self.settings.system_payload),
            ),
        };

        let engine =
            ProcessEngine::create(runtime, payload, &self.settings.scratch_path()).await?;
        Ok(Arc::new(engine))
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), LoadError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| LoadError::init(format!("cannot mark {} executable: {}", path.display(), e)))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<(), LoadError> {
    Ok(())
}

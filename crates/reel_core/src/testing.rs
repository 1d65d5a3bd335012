//! In-memory test doubles for the engine and source fetcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Settings;
use crate::engine::{
    EngineError, EngineLoader, EngineResult, ExecOutcome, LoadError, MediaEngine,
};
use crate::fetch::{FetchError, SourceFetcher};
use crate::logging::JobLogger;
use crate::models::AssemblyJob;
use crate::orchestrator::Context;
use crate::workspace::Workspace;

/// Engine that keeps files in memory and imitates the commands the
/// pipeline issues:
///
/// - trim: output = input bytes + `[<ss>-<to>]`
/// - concat: output = listed files joined in manifest order
/// - mix: output = video bytes + `+mix`
/// - audio probe: exit 0 iff base audio is switched on
///
/// Any command whose input is missing exits 1.
#[derive(Default)]
pub struct MemoryEngine {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    commands: Mutex<Vec<Vec<String>>>,
    base_audio: AtomicBool,
    fail_when: Mutex<Option<String>>,
    exec_error_when: Mutex<Option<String>>,
    undeletable: Mutex<Vec<String>>,
    terminated: AtomicBool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base_audio(&self, has_audio: bool) {
        self.base_audio.store(has_audio, Ordering::SeqCst);
    }

    /// Commands with an argument containing `needle` write a partial
    /// output and exit 1.
    pub fn fail_when(&self, needle: &str) {
        *self.fail_when.lock() = Some(needle.to_string());
    }

    /// Commands with an argument containing `needle` return an engine error.
    pub fn fail_exec_when(&self, needle: &str) {
        *self.exec_error_when.lock() = Some(needle.to_string());
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.undeletable.lock().push(name.to_string());
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().clone()
    }

    /// Recorded commands rendered as single lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.join(" ")).collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().get(name).cloned()
    }

    fn put(&self, name: &str, data: Vec<u8>) {
        self.files.lock().insert(name.to_string(), data);
    }

    fn run(&self, args: &[String]) -> ExecOutcome {
        let value_after = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        let inputs: Vec<String> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        let output = args.last().cloned().unwrap_or_default();
        let missing = |name: &str| {
            ExecOutcome::new(1, vec![format!("{}: No such file or directory", name)])
        };

        for input in &inputs {
            if self.get(input).is_none() {
                return missing(input.as_str());
            }
        }

        if value_after("-f").as_deref() == Some("null") {
            let code = if self.base_audio.load(Ordering::SeqCst) {
                0
            } else {
                1
            };
            return ExecOutcome::new(code, vec![]);
        }

        if value_after("-f").as_deref() == Some("concat") {
            let list = self.get(&inputs[0]).unwrap_or_default();
            let mut joined = Vec::new();
            for line in String::from_utf8_lossy(&list).lines() {
                let name = line
                    .trim_start_matches("file '")
                    .trim_end_matches('\'')
                    .replace("'\\''", "'");
                match self.get(&name) {
                    Some(bytes) => joined.extend(bytes),
                    None => return missing(name.as_str()),
                }
            }
            self.put(&output, joined);
            return ExecOutcome::new(0, vec!["concat done".to_string()]);
        }

        if args.iter().any(|a| a == "-filter_complex") {
            let mut bytes = self.get(&inputs[0]).unwrap_or_default();
            bytes.extend_from_slice(b"+mix");
            self.put(&output, bytes);
            return ExecOutcome::new(0, vec!["mix done".to_string()]);
        }

        if let (Some(ss), Some(to)) = (value_after("-ss"), value_after("-to")) {
            let mut bytes = self.get(&inputs[0]).unwrap_or_default();
            bytes.extend_from_slice(format!("[{}-{}]", ss, to).as_bytes());
            self.put(&output, bytes);
            return ExecOutcome::new(0, vec!["trim done".to_string()]);
        }

        ExecOutcome::new(1, vec!["unrecognized command".to_string()])
    }
}

fn matches(needle: &Mutex<Option<String>>, args: &[String]) -> bool {
    match needle.lock().as_deref() {
        Some(needle) => args.iter().any(|a| a.contains(needle)),
        None => false,
    }
}

#[async_trait]
impl MediaEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()> {
        if self.is_terminated() {
            return Err(EngineError::Terminated);
        }
        self.put(name, data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        self.get(name).ok_or_else(|| EngineError::not_found(name))
    }

    async fn delete_file(&self, name: &str) -> EngineResult<()> {
        if self.undeletable.lock().iter().any(|n| n == name) {
            return Err(EngineError::io(
                format!("delete {}", name),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            ));
        }
        match self.files.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(EngineError::not_found(name)),
        }
    }

    async fn exec(&self, args: &[String]) -> EngineResult<ExecOutcome> {
        self.commands.lock().push(args.to_vec());

        if matches(&self.exec_error_when, args) {
            return Err(EngineError::Unsupported("simulated engine fault".to_string()));
        }
        if matches(&self.fail_when, args) {
            if let Some(output) = args.last().filter(|o| o.as_str() != "-") {
                self.put(output, b"partial".to_vec());
            }
            return Ok(ExecOutcome::new(1, vec!["simulated failure".to_string()]));
        }

        Ok(self.run(args))
    }

    async fn terminate(&self) -> EngineResult<()> {
        self.terminated.store(true, Ordering::SeqCst);
        self.files.lock().clear();
        Ok(())
    }
}

/// Loader handing out fresh [`MemoryEngine`]s and counting loads.
#[derive(Default)]
pub struct MemoryLoader {
    loads: AtomicUsize,
    delay: Duration,
    error: Option<LoadError>,
    last: Mutex<Option<Arc<MemoryEngine>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: LoadError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn last_engine(&self) -> Option<Arc<MemoryEngine>> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl EngineLoader for MemoryLoader {
    async fn load(&self) -> Result<Arc<dyn MediaEngine>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(ref error) = self.error {
            return Err(error.clone());
        }
        let engine = Arc::new(MemoryEngine::new());
        *self.last.lock() = Some(engine.clone());
        Ok(engine as Arc<dyn MediaEngine>)
    }
}

/// Fetcher serving fixed bytes per URL; unknown URLs are HTTP 404.
#[derive(Default)]
pub struct StaticFetcher {
    sources: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    fetched: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: &[u8]) -> Self {
        self.sources.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Hold every fetch of `url` for `delay` before answering.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.sources
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Whether two handles point at the same engine instance.
pub fn same_engine(a: &Arc<dyn MediaEngine>, b: &Arc<dyn MediaEngine>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Context over `engine` for a job named `name` with no clips.
pub fn context_with(engine: Arc<MemoryEngine>, fetcher: StaticFetcher, name: &str) -> Context {
    Context::new(
        AssemblyJob::new(name),
        Settings::default(),
        Workspace::new(engine),
        Arc::new(fetcher),
        JobLogger::detached(name),
    )
}

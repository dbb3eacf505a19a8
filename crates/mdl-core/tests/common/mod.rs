//! Scripted engine for driving workers step by step from tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use mdl_core::engine::{DownloadOptions, Engine, EngineError, MediaInfo};
use mdl_core::progress::{ProgressEvent, ProgressSink, TransferProgress};

/// How long a scripted engine waits at a gate before giving up.
const GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Counting semaphore the test releases to let an engine run advance.
#[derive(Default)]
pub struct Gate {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Gate {
    pub fn release(&self, n: usize) {
        *self.permits.lock().unwrap() += n;
        self.cv.notify_all();
    }

    fn acquire(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            permits = self.cv.wait_timeout(permits, deadline - now).unwrap().0;
        }
        *permits -= 1;
        true
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    /// Block until the test releases this URL's gate.
    Wait,
    Tick { downloaded: u64, total: Option<u64> },
    Finished,
    ReportError,
    Fail(&'static str),
    Panic,
}

pub fn tick(downloaded: u64, total: u64) -> Step {
    Step::Tick {
        downloaded,
        total: Some(total),
    }
}

/// Engine that plays a script per URL, falling back to a default script.
pub struct ScriptedEngine {
    default_script: Vec<Step>,
    scripts: HashMap<String, Vec<Step>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl ScriptedEngine {
    pub fn new(default_script: Vec<Step>) -> Self {
        Self {
            default_script,
            scripts: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_script(mut self, url: &str, script: Vec<Step>) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn gate(&self, url: &str) -> Arc<Gate> {
        Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default(),
        )
    }
}

impl Engine for ScriptedEngine {
    fn fetch_info(&self, url: &str) -> Result<MediaInfo, EngineError> {
        Ok(MediaInfo {
            title: format!("title of {url}"),
            duration: 1.0,
            uploader: "tester".into(),
            view_count: 0,
            thumbnail: String::new(),
        })
    }

    fn run(
        &self,
        url: &str,
        _options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(), EngineError> {
        let script = self.scripts.get(url).unwrap_or(&self.default_script);
        for step in script {
            match step {
                Step::Wait => {
                    if !self.gate(url).acquire(GATE_TIMEOUT) {
                        return Err(EngineError::Failed("test gate timed out".into()));
                    }
                }
                Step::Tick { downloaded, total } => {
                    sink.report(ProgressEvent::Transfer(TransferProgress {
                        downloaded: *downloaded,
                        total: *total,
                        speed: Some(1000.0),
                        eta: Some(1),
                    }))
                }
                Step::Finished => sink.report(ProgressEvent::Finished { filename: None }),
                Step::ReportError => sink.report(ProgressEvent::Failed { reason: None }),
                Step::Fail(msg) => return Err(EngineError::Failed(msg.to_string())),
                Step::Panic => panic!("scripted engine panic"),
            }
        }
        Ok(())
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

use async_trait::async_trait;
use era5dl_lib::config::{Config, VariableDef, YearRange};
use era5dl_lib::retrieve::{RetrievalRequest, RetrieveError, Retriever};
use era5dl_lib::retry::Sleeper;
use eyre::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub const NETCDF_STUB: &[u8] = b"CDF\x01stub";

/// Single variable (`2m_temperature` → `tas`), single year 1966, all months.
pub fn create_test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.variables = vec![VariableDef::new("2m_temperature", "tas")];
    config.years = YearRange {
        start: 1966,
        end: 1966,
    };
    config.output.path = output_dir.to_path_buf();
    config.download.max_workers = 2;
    config
}

pub fn setup_test_environment() -> Result<TempDir> {
    Ok(tempfile::tempdir()?)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub dataset: String,
    pub request: RetrievalRequest,
    pub destination: PathBuf,
}

/// In-memory stand-in for the archive.
///
/// Writes [`NETCDF_STUB`] to the destination on success. Failures can be
/// scripted per file name: a fixed number of failures before succeeding, or
/// failing forever.
#[derive(Default)]
pub struct MockRetriever {
    calls: Mutex<Vec<RecordedCall>>,
    transient_failures: HashMap<String, u32>,
    permanent_failures: HashSet<String>,
    panics: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` calls for `file_name`, then succeed.
    pub fn failing_first(mut self, file_name: &str, times: u32) -> Self {
        self.transient_failures.insert(file_name.to_string(), times);
        self
    }

    /// Fail every call for `file_name`.
    pub fn always_failing(mut self, file_name: &str) -> Self {
        self.permanent_failures.insert(file_name.to_string());
        self
    }

    /// Panic inside the call for `file_name`.
    pub fn panicking(mut self, file_name: &str) -> Self {
        self.panics.insert(file_name.to_string());
        self
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, file_name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| file_name_of(&call.destination) == file_name)
            .count()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        destination: &Path,
    ) -> Result<(), RetrieveError> {
        let file_name = file_name_of(destination);
        let previous_calls = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls
                .iter()
                .filter(|call| file_name_of(&call.destination) == file_name)
                .count() as u32;
            calls.push(RecordedCall {
                dataset: dataset.to_string(),
                request: request.clone(),
                destination: destination.to_path_buf(),
            });
            previous
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(&file_name) {
            panic!("mock retriever panicked for {file_name}");
        }
        if self.permanent_failures.contains(&file_name) {
            return Err(RetrieveError::Failed(format!(
                "{file_name} is permanently unavailable"
            )));
        }
        if let Some(times) = self.transient_failures.get(&file_name) {
            if previous_calls < *times {
                return Err(RetrieveError::Failed(format!(
                    "{file_name} failed on call {}",
                    previous_calls + 1
                )));
            }
        }

        tokio::fs::write(destination, NETCDF_STUB).await?;
        Ok(())
    }
}

/// Records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

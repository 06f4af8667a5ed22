use super::credentials::Credentials;
use super::request::RetrievalRequest;
use super::{RetrieveError, Retriever};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const API_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
/// Longest silence tolerated on any connection, including mid-transfer.
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INITIAL: Duration = Duration::from_secs(1);
const POLL_MAX: Duration = Duration::from_secs(120);
const POLL_GROWTH: f64 = 1.5;
/// Consecutive status-poll failures tolerated before the attempt is given up.
const POLL_ERROR_LIMIT: u32 = 3;

#[derive(Serialize)]
struct ExecutionBody<'a> {
    inputs: &'a RetrievalRequest,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: ResultAsset,
}

#[derive(Debug, Deserialize)]
struct ResultAsset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
    #[serde(rename = "file:size")]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProblemDetails {
    title: Option<String>,
    detail: Option<String>,
}

/// Client for the Climate Data Store retrieve API.
///
/// A retrieval submits a job, polls it until the archive has produced the file,
/// then streams the result to disk.
#[derive(Debug, Clone)]
pub struct CdsClient {
    http: Client,
    credentials: Credentials,
    poll: PollSchedule,
}

#[derive(Debug, Clone, Copy)]
struct PollSchedule {
    initial: Duration,
    max: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial: POLL_INITIAL,
            max: POLL_MAX,
        }
    }
}

impl CdsClient {
    pub fn new(credentials: Credentials) -> Result<Self, RetrieveError> {
        Self::build(credentials, READ_TIMEOUT, PollSchedule::default())
    }

    fn build(
        credentials: Credentials,
        read_timeout: Duration,
        poll: PollSchedule,
    ) -> Result<Self, RetrieveError> {
        let http = Client::builder()
            .user_agent(concat!("era5dl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self {
            http,
            credentials,
            poll,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/retrieve/v1/{}",
            self.credentials.url.trim_end_matches('/'),
            path
        )
    }

    async fn submit(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
    ) -> Result<JobStatus, RetrieveError> {
        let response = self
            .http
            .post(self.api_url(&format!("processes/{dataset}/execution")))
            .header(TOKEN_HEADER, &self.credentials.key)
            .timeout(API_TIMEOUT)
            .json(&ExecutionBody { inputs: request })
            .send()
            .await?;
        Ok(check_response(response).await?.json().await?)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, RetrieveError> {
        let response = self
            .http
            .get(self.api_url(&format!("jobs/{job_id}")))
            .header(TOKEN_HEADER, &self.credentials.key)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        Ok(check_response(response).await?.json().await?)
    }

    async fn job_results(&self, job_id: &str) -> Result<AssetValue, RetrieveError> {
        let response = self
            .http
            .get(self.api_url(&format!("jobs/{job_id}/results")))
            .header(TOKEN_HEADER, &self.credentials.key)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        let results: JobResults = check_response(response).await?.json().await?;
        Ok(results.asset.value)
    }

    async fn wait_for_job(&self, mut job: JobStatus) -> Result<(), RetrieveError> {
        let mut interval = self.poll.initial;
        let mut poll_errors = 0;
        loop {
            match job.status.as_str() {
                "successful" => return Ok(()),
                "failed" | "rejected" | "dismissed" => {
                    let message = match self.job_results(&job.job_id).await {
                        Err(RetrieveError::Api { message, .. }) => message,
                        Err(err) => err.to_string(),
                        Ok(_) => "no error details available".to_string(),
                    };
                    return Err(RetrieveError::JobFailed {
                        job_id: job.job_id,
                        status: job.status,
                        message,
                    });
                }
                "accepted" | "running" => {
                    debug!(job_id = %job.job_id, status = %job.status, "Job not ready, polling again in {:?}", interval);
                }
                other => {
                    return Err(RetrieveError::Protocol(format!(
                        "job {} has unknown status {other:?}",
                        job.job_id
                    )));
                }
            }

            tokio::time::sleep(interval).await;
            interval = interval.mul_f64(POLL_GROWTH).min(self.poll.max);

            // On a tolerated failure `job` keeps its last known status and is polled again.
            match self.job_status(&job.job_id).await {
                Ok(next) => {
                    job = next;
                    poll_errors = 0;
                }
                Err(err) if is_transient(&err) && poll_errors < POLL_ERROR_LIMIT => {
                    poll_errors += 1;
                    warn!(
                        job_id = %job.job_id,
                        "Polling job status failed ({}/{}): {}",
                        poll_errors, POLL_ERROR_LIMIT, err
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn transfer(&self, asset: &AssetValue, destination: &Path) -> Result<u64, RetrieveError> {
        let partial = partial_path(destination);
        match self.stream_to(&asset.href, &partial).await {
            Ok(written) => {
                if let Some(expected) = asset.size.filter(|expected| *expected != written) {
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(RetrieveError::SizeMismatch {
                        expected,
                        actual: written,
                    });
                }
                tokio::fs::rename(&partial, destination).await?;
                Ok(written)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }

    async fn stream_to(&self, href: &str, path: &Path) -> Result<u64, RetrieveError> {
        let response = check_response(self.http.get(href).send().await?).await?;
        let mut stream = response.bytes_stream();

        // `create` truncates whatever an earlier attempt left behind.
        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::new(file);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl Retriever for CdsClient {
    async fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        destination: &Path,
    ) -> Result<(), RetrieveError> {
        let job = self.submit(dataset, request).await?;
        info!(job_id = %job.job_id, output = %destination.display(), "Request queued");

        let job_id = job.job_id.clone();
        self.wait_for_job(job).await?;

        let asset = self.job_results(&job_id).await?;
        debug!(job_id = %job_id, href = %asset.href, size = ?asset.size, "Transferring result");
        let written = self.transfer(&asset, destination).await?;
        debug!(job_id = %job_id, bytes = written, output = %destination.display(), "Transfer complete");
        Ok(())
    }
}

/// `{destination}.part`, the file a transfer writes before it is renamed into place.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Errors worth polling again for: connection trouble, throttling and server-side failures.
fn is_transient(err: &RetrieveError) -> bool {
    match err {
        RetrieveError::Http(err) => !err.is_decode(),
        RetrieveError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

async fn check_response(response: Response) -> Result<Response, RetrieveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RetrieveError::Api {
        status: status.as_u16(),
        message: problem_message(&body),
    })
}

fn problem_message(body: &str) -> String {
    match serde_json::from_str::<ProblemDetails>(body) {
        Ok(ProblemDetails {
            title: Some(title),
            detail: Some(detail),
        }) => format!("{title}: {detail}"),
        Ok(ProblemDetails {
            title: Some(message),
            detail: None,
        })
        | Ok(ProblemDetails {
            title: None,
            detail: Some(message),
        }) => message,
        _ => body.trim().to_string(),
    }
}

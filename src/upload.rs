//! Artifact uploads.
//!
//! Every artifact is PUT to its own URL as `text/plain`. Only `201 Created`
//! counts as success. Uploads run concurrently and fail independently: the
//! fan-out always waits for all of them and reports one outcome each.

use crate::artifacts::Artifact;
use crate::error::{PutError, UploadError};
use crate::ui;
use rayon::prelude::*;

pub const CONTENT_TYPE: &str = "text/plain";

const CREATED: u16 = 201;

/// Blocking HTTP client for PUT uploads.
#[derive(Clone)]
pub struct HttpPut {
    agent: ureq::Agent,
}

impl HttpPut {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// PUT `body` to `url`, optionally with a bearer token.
    pub fn put(&self, url: &str, body: &[u8], bearer: Option<&str>) -> Result<(), PutError> {
        let mut request = self.agent.put(url).header("Content-Type", CONTENT_TYPE);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send(body)?;
        match response.status().as_u16() {
            CREATED => Ok(()),
            status => Err(PutError::Status(status)),
        }
    }
}

impl Default for HttpPut {
    fn default() -> Self {
        Self::new()
    }
}

/// One artifact to upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadJob<'a> {
    pub artifact: Artifact,
    /// Destination; `None` skips the upload.
    pub url: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded,
    Skipped,
    Failed(UploadError),
}

/// Per-artifact results of a fan-out, in job order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub results: Vec<(Artifact, UploadOutcome)>,
}

impl UploadReport {
    pub fn failures(&self) -> impl Iterator<Item = &UploadError> {
        self.results.iter().filter_map(|(_, outcome)| match outcome {
            UploadOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    pub fn uploaded(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, o)| matches!(o, UploadOutcome::Uploaded))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Upload every job concurrently and wait for all of them.
pub fn fan_out(client: &HttpPut, jobs: &[UploadJob<'_>]) -> UploadReport {
    let upload = |job: &UploadJob<'_>| (job.artifact, upload_one(client, job));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.len().max(1))
        .thread_name(|i| format!("upload-{i}"))
        .build();

    let results: Vec<(Artifact, UploadOutcome)> = match pool {
        Ok(pool) => pool.install(|| jobs.par_iter().map(upload).collect()),
        Err(e) => {
            log::warn!("Failed to create upload thread pool, uploading sequentially: {e}");
            jobs.iter().map(upload).collect()
        }
    };

    UploadReport { results }
}

fn upload_one(client: &HttpPut, job: &UploadJob<'_>) -> UploadOutcome {
    let Some(url) = job.url else {
        log::warn!("No upload URL configured for {}, skipping", job.artifact);
        return UploadOutcome::Skipped;
    };

    log::info!(
        "Uploading {} ({})",
        job.artifact,
        ui::format_size(job.body.len() as u64)
    );
    match client.put(url, job.body, None) {
        Ok(()) => {
            log::debug!("Uploaded {} to {url}", job.artifact);
            UploadOutcome::Uploaded
        }
        Err(source) => {
            let err = UploadError::UploadFailed {
                artifact: job.artifact,
                url: url.to_string(),
                source,
            };
            log::error!("{err}");
            UploadOutcome::Failed(err)
        }
    }
}

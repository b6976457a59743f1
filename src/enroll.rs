use anyhow::{Context, Result, bail};
use futures::StreamExt;
use reqwest::Url;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::data_models::StudentEmbedding;
use crate::store::EmbeddingStore;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of an enrollment batch file.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentRecord {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub school_id: Option<String>,
    pub photo_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Created,
    Updated,
    NoFace,
    DownloadFailed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrollSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Turns an image into one embedding per detected face, most prominent first.
pub trait FaceEmbedder: Send + Sync {
    fn embed_faces(&self, image: Vec<u8>) -> impl Future<Output = Result<Vec<Vec<f64>>>> + Send;
}

#[derive(Deserialize)]
struct EmbedResponse {
    faces: Vec<Face>,
}

#[derive(Deserialize)]
struct Face {
    embedding: Vec<f64>,
}

/// Face engine reached over HTTP: raw image bytes in, `{"faces":[{"embedding":[..]}]}` out.
pub struct HttpFaceEmbedder {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpFaceEmbedder {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid embedding url: {endpoint}"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

impl FaceEmbedder for HttpFaceEmbedder {
    async fn embed_faces(&self, image: Vec<u8>) -> Result<Vec<Vec<f64>>> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .context("face engine request failed")?
            .error_for_status()
            .context("face engine rejected image")?;

        let body: EmbedResponse = res
            .json()
            .await
            .context("failed to decode face engine response")?;
        Ok(body.faces.into_iter().map(|f| f.embedding).collect())
    }
}

pub struct Enroller<E, S> {
    embedder: E,
    store: S,
    http: reqwest::Client,
}

impl<E: FaceEmbedder, S: EmbeddingStore> Enroller<E, S> {
    pub fn new(embedder: E, store: S) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            embedder,
            store,
            http,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            bail!("empty image body");
        }
        Ok(bytes.to_vec())
    }

    pub async fn process_student(&self, record: &EnrollmentRecord) -> Result<EnrollOutcome> {
        log::info!("processing student {} ({})", record.student_id, record.name);

        let image = match self.download_image(&record.photo_url).await {
            Ok(image) => image,
            Err(e) => {
                log::error!("error downloading {}: {:#}", record.photo_url, e);
                return Ok(EnrollOutcome::DownloadFailed);
            }
        };

        let faces = self
            .embedder
            .embed_faces(image)
            .await
            .with_context(|| format!("embedding photo for {}", record.student_id))?;

        let Some(embedding) = faces.into_iter().next() else {
            log::warn!("no face detected for {}, skipping", record.student_id);
            return Ok(EnrollOutcome::NoFace);
        };

        let student = StudentEmbedding::new(
            record.student_id.clone(),
            record.school_id.clone(),
            Some(record.name.clone()),
            Some(record.photo_url.clone()),
            embedding,
        );
        let existed = self.store.upsert_student(&student).await?;

        if existed {
            log::info!("updated existing record for {}", record.student_id);
            Ok(EnrollOutcome::Updated)
        } else {
            log::info!("enrolled {}", record.student_id);
            Ok(EnrollOutcome::Created)
        }
    }

    /// Enrolls a batch with at most `concurrency` students in flight.
    pub async fn enroll_all(
        &self,
        records: &[EnrollmentRecord],
        concurrency: usize,
    ) -> EnrollSummary {
        let results: Vec<(&str, Result<EnrollOutcome>)> = futures::stream::iter(records)
            .map(|record| async move {
                (record.student_id.as_str(), self.process_student(record).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut summary = EnrollSummary::default();
        for (student_id, result) in results {
            match result {
                Ok(EnrollOutcome::Created) => summary.created += 1,
                Ok(EnrollOutcome::Updated) => summary.updated += 1,
                Ok(EnrollOutcome::NoFace) => summary.skipped += 1,
                Ok(EnrollOutcome::DownloadFailed) => summary.failed += 1,
                Err(e) => {
                    log::error!("enrolling {student_id} failed: {:#}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Reads a JSON array of [`EnrollmentRecord`]s.
pub fn parse_records(json: &str) -> Result<Vec<EnrollmentRecord>> {
    serde_json::from_str(json).context("invalid enrollment file")
}

#[test]
fn test_parse_records() {
    let records = parse_records(
        r#"[
            {"student_id": "101", "name": "Alice", "school_id": "SCH-001", "photo_url": "http://example.com/alice.jpg"},
            {"student_id": "102", "name": "Bob", "photo_url": "http://example.com/bob.jpg"}
        ]"#,
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].school_id.as_deref(), Some("SCH-001"));
    assert_eq!(records[1].school_id, None);

    assert!(parse_records(r#"{"student_id": "101"}"#).is_err());
}

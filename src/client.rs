//! Client side of a photo search: validates the student id, posts it to
//! `/sorting/find` and renders the result onto a [`SearchSurface`].

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

use crate::api::models::{ErrorBody, MatchResult};

pub const FIND_ENDPOINT: &str = "/sorting/find";

pub const IDLE_LABEL: &str = "Find Photos";
pub const BUSY_LABEL: &str = "Searching...";

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a Student ID";
pub const SEARCHING_MESSAGE: &str = "Searching for matches...";
pub const NO_MATCHES_MESSAGE: &str = "No matching photos found for this student.";
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

impl StatusKind {
    /// Style class for the status area.
    pub fn class_name(&self) -> &'static str {
        match self {
            StatusKind::Info => "info",
            StatusKind::Success => "success",
            StatusKind::Error => "error",
        }
    }
}

/// Display description of a single match.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub image_url: String,
    pub alt_text: &'static str,
    pub lazy_load: bool,
    pub similarity_label: String,
}

impl From<&MatchResult> for ResultCard {
    fn from(m: &MatchResult) -> Self {
        ResultCard {
            image_url: m.image_url.clone(),
            alt_text: "Matched Photo",
            lazy_load: true,
            similarity_label: similarity_label(m.similarity),
        }
    }
}

/// `0.873` -> `"87.3%"`
///
/// Exact halfway values round away from zero (`87.25` -> `87.3`), where
/// `{:.1}` alone would round them to even.
pub fn similarity_label(similarity: f64) -> String {
    let percent = similarity * 100.0;
    // an exact tie at one decimal is an odd multiple of 0.25
    let quarters = percent * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return format!("{:.1}%", percent + percent.signum() * 0.05);
    }
    format!("{:.1}%", percent)
}

pub fn found_message(count: usize) -> String {
    format!("Found {count} matches!")
}

/// The widgets a search drives. Implemented by whatever toolkit hosts it.
pub trait SearchSurface {
    fn set_trigger(&mut self, enabled: bool, label: &str);
    fn show_status(&mut self, message: &str, kind: StatusKind);
    fn clear_results(&mut self);
    fn render(&mut self, cards: Vec<ResultCard>);
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait SearchTransport {
    fn post_find(&self, student_id: &str) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// Talks to a running server over HTTP with a form-encoded body.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(FIND_ENDPOINT))
            .with_context(|| format!("invalid server url: {base_url}"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SearchTransport for HttpTransport {
    async fn post_find(&self, student_id: &str) -> Result<RawResponse> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .form(&[("student_id", student_id)])
            .send()
            .await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Request(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    NoMatches,
    Found(usize),
}

#[derive(Deserialize)]
struct SearchResponse {
    matches: Vec<MatchResult>,
}

/// Holds the surface for the length of one search and puts the trigger
/// back to idle when dropped, whichever way the search ends.
struct BusyGuard<'a, S: SearchSurface> {
    surface: &'a mut S,
}

impl<S: SearchSurface> Deref for BusyGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.surface
    }
}

impl<S: SearchSurface> DerefMut for BusyGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.surface
    }
}

impl<S: SearchSurface> Drop for BusyGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_trigger(true, IDLE_LABEL);
    }
}

pub struct SearchController<T, S> {
    transport: T,
    surface: S,
}

impl<T: SearchTransport, S: SearchSurface> SearchController<T, S> {
    pub fn new(transport: T, surface: S) -> Self {
        Self { transport, surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Runs one idle -> searching -> result -> idle cycle.
    pub async fn execute_search(&mut self, raw_input: &str) -> Result<SearchOutcome, SearchError> {
        let mut surface = BusyGuard {
            surface: &mut self.surface,
        };

        let student_id = raw_input.trim();
        if student_id.is_empty() {
            surface.show_status(EMPTY_INPUT_MESSAGE, StatusKind::Error);
            return Err(SearchError::Validation(EMPTY_INPUT_MESSAGE.to_string()));
        }

        surface.set_trigger(false, BUSY_LABEL);
        surface.show_status(SEARCHING_MESSAGE, StatusKind::Info);
        surface.clear_results();

        match fetch_matches(&self.transport, student_id).await {
            Ok(matches) if matches.is_empty() => {
                surface.show_status(NO_MATCHES_MESSAGE, StatusKind::Info);
                Ok(SearchOutcome::NoMatches)
            }
            Ok(matches) => {
                surface.show_status(&found_message(matches.len()), StatusKind::Success);
                surface.render(matches.iter().map(ResultCard::from).collect());
                Ok(SearchOutcome::Found(matches.len()))
            }
            Err(e) => {
                log::warn!("search for {student_id} failed: {e}");
                surface.show_status(&e.to_string(), StatusKind::Error);
                Err(e)
            }
        }
    }
}

async fn fetch_matches<T: SearchTransport>(
    transport: &T,
    student_id: &str,
) -> Result<Vec<MatchResult>, SearchError> {
    let response = transport
        .post_find(student_id)
        .await
        .map_err(|e| SearchError::Request(format!("{e:#}")))?;

    if !response.is_success() {
        let body: ErrorBody = serde_json::from_str(&response.body)
            .map_err(|e| SearchError::Request(e.to_string()))?;
        return Err(SearchError::Request(failure_message(body)));
    }

    let body: SearchResponse =
        serde_json::from_str(&response.body).map_err(|e| SearchError::Request(e.to_string()))?;
    Ok(body.matches)
}

fn failure_message(body: ErrorBody) -> String {
    match body.detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) => {
            SEARCH_FAILED_MESSAGE.to_string()
        }
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_label_rounds_to_one_decimal() {
        assert_eq!(similarity_label(0.873), "87.3%");
        assert_eq!(similarity_label(1.0), "100.0%");
        assert_eq!(similarity_label(0.0), "0.0%");
        assert_eq!(similarity_label(0.12345), "12.3%");
        assert_eq!(similarity_label(0.5), "50.0%");
    }

    #[test]
    fn test_similarity_label_rounds_ties_away_from_zero() {
        assert_eq!(similarity_label(0.8725), "87.3%");
        assert_eq!(similarity_label(0.1225), "12.3%");
        assert_eq!(similarity_label(0.0125), "1.3%");
        assert_eq!(similarity_label(0.0025), "0.3%");
        assert_eq!(similarity_label(0.0075), "0.8%");
        assert_eq!(similarity_label(-0.0025), "-0.3%");
        // x.x5 with an even tenth is still a tie
        assert_eq!(similarity_label(0.0225), "2.3%");
    }

    #[test]
    fn test_card_from_match() {
        let m = MatchResult {
            image_url: "/img/a.jpg".to_string(),
            similarity: 0.873,
            gallery_id: None,
        };
        let card = ResultCard::from(&m);
        assert_eq!(card.image_url, "/img/a.jpg");
        assert_eq!(card.similarity_label, "87.3%");
        assert!(card.lazy_load);
        assert_eq!(card.alt_text, "Matched Photo");
    }

    #[test]
    fn test_failure_message() {
        let parse = |s: &str| failure_message(serde_json::from_str(s).unwrap());
        assert_eq!(parse(r#"{"detail":"Student not found"}"#), "Student not found");
        assert_eq!(parse(r#"{}"#), SEARCH_FAILED_MESSAGE);
        assert_eq!(parse(r#"{"detail":""}"#), SEARCH_FAILED_MESSAGE);
        assert_eq!(parse(r#"{"detail":null}"#), SEARCH_FAILED_MESSAGE);
        assert_eq!(parse(r#"{"detail":["bad"]}"#), r#"["bad"]"#);
    }

    #[test]
    fn test_http_transport_endpoint() {
        let transport = HttpTransport::new("http://localhost:8000").unwrap();
        assert_eq!(
            transport.endpoint().as_str(),
            "http://localhost:8000/sorting/find"
        );
        assert!(HttpTransport::new("not a url").is_err());
    }

    #[test]
    fn test_found_message_keeps_plural() {
        assert_eq!(found_message(1), "Found 1 matches!");
        assert_eq!(found_message(3), "Found 3 matches!");
    }
}

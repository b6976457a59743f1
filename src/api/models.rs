use serde::{Deserialize, Serialize};

use crate::matcher::{PhotoMatch, StudentMatches};

#[derive(Debug, Deserialize)]
pub struct FindForm {
    #[serde(default)]
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FindParams {
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindResponse {
    pub student_id: String,
    pub school_id: Option<String>,
    pub matches: Vec<MatchResult>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub image_url: String,
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_id: Option<String>,
}

/// Body of every non-success response. `detail` is kept loose because
/// other servers may put structured validation errors there.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(serde_json::Value::String(detail.into())),
        }
    }
}

impl From<PhotoMatch> for MatchResult {
    fn from(m: PhotoMatch) -> Self {
        MatchResult {
            image_url: m.image_url,
            similarity: m.similarity,
            gallery_id: Some(m.gallery_id),
        }
    }
}

impl From<StudentMatches> for FindResponse {
    fn from(found: StudentMatches) -> Self {
        let matches: Vec<MatchResult> = found.matches.into_iter().map(Into::into).collect();
        FindResponse {
            student_id: found.student_id,
            school_id: found.school_id,
            count: matches.len(),
            matches,
        }
    }
}

use mongodb::bson::DateTime;
use thiserror::Error;

use crate::data_models::MatchRecord;
use crate::similarity::cosine_similarity;
use crate::store::EmbeddingStore;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Student not found")]
    StudentNotFound,
    #[error("Student has no embedding")]
    MissingEmbedding,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMatch {
    pub gallery_id: String,
    pub image_url: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentMatches {
    pub student_id: String,
    pub school_id: Option<String>,
    /// Highest similarity first.
    pub matches: Vec<PhotoMatch>,
}

/// Compares a student's embedding against every gallery image of their school.
pub struct PhotoMatcher<S> {
    store: S,
    default_threshold: f64,
}

impl<S: EmbeddingStore> PhotoMatcher<S> {
    pub fn new(store: S, default_threshold: f64) -> Self {
        Self {
            store,
            default_threshold,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    pub async fn find_matches(
        &self,
        student_id: &str,
        threshold: Option<f64>,
    ) -> Result<StudentMatches, MatchError> {
        let threshold = threshold.unwrap_or(self.default_threshold);

        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or(MatchError::StudentNotFound)?;

        let student_vector = match student.vector_embedding {
            Some(v) if !v.is_empty() => v,
            _ => return Err(MatchError::MissingEmbedding),
        };
        let school_id = student.school_id;

        let gallery = self.store.gallery_for_school(school_id.as_deref()).await?;
        log::debug!(
            "found {} gallery images for school {:?}",
            gallery.len(),
            school_id
        );

        let mut matches = Vec::new();
        for image in gallery {
            let gallery_id = image.gallery_id();
            let (Some(gallery_vector), Some(image_url)) = (image.vector_gallery, image.image_url)
            else {
                log::debug!("gallery image {gallery_id} has no embedding or url, skipping");
                continue;
            };

            let Some(similarity) = cosine_similarity(&student_vector, &gallery_vector) else {
                log::warn!(
                    "gallery image {gallery_id} embedding has {} dimensions, student has {}",
                    gallery_vector.len(),
                    student_vector.len()
                );
                continue;
            };
            log::debug!("compared with {gallery_id}, similarity: {similarity}");

            if similarity > threshold {
                let record = MatchRecord {
                    student_id: student_id.to_string(),
                    school_id: school_id.clone(),
                    gallery_image_id: gallery_id.clone(),
                    image_url: image_url.clone(),
                    similarity,
                    student_vector: student_vector.clone(),
                    gallery_vector,
                    matched_at: DateTime::now(),
                };
                self.store.record_match(&record).await?;

                matches.push(PhotoMatch {
                    gallery_id,
                    image_url,
                    similarity,
                });
            }
        }

        rank_matches(&mut matches);
        log::info!("student {student_id}: {} matches", matches.len());

        Ok(StudentMatches {
            student_id: student_id.to_string(),
            school_id,
            matches,
        })
    }
}

/// Sort by descending similarity; equal scores keep gallery order.
pub fn rank_matches(matches: &mut [PhotoMatch]) {
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}

#[test]
fn test_rank_matches_descending_and_stable() {
    let m = |id: &str, similarity: f64| PhotoMatch {
        gallery_id: id.to_string(),
        image_url: format!("/static/{id}.jpg"),
        similarity,
    };

    let mut matches = vec![m("a", 0.2), m("b", 0.9), m("c", 0.5), m("d", 0.9)];
    rank_matches(&mut matches);

    let order: Vec<&str> = matches.iter().map(|m| m.gallery_id.as_str()).collect();
    assert_eq!(order, vec!["b", "d", "c", "a"]);
}

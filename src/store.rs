use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use tokio::sync::RwLock;

use crate::data_models::{GalleryImage, MatchRecord, StudentEmbedding};
use crate::db::{Database, GalleryRepo, MatchRepo, StudentRepo};

/// Everything the matcher and the enroller need from persistence.
pub trait EmbeddingStore: Send + Sync + 'static {
    fn find_student(
        &self,
        student_id: &str,
    ) -> impl Future<Output = Result<Option<StudentEmbedding>>> + Send;

    fn gallery_for_school(
        &self,
        school_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<GalleryImage>>> + Send;

    fn record_match(&self, record: &MatchRecord) -> impl Future<Output = Result<()>> + Send;

    /// Returns true if the student already existed.
    fn upsert_student(
        &self,
        student: &StudentEmbedding,
    ) -> impl Future<Output = Result<bool>> + Send;
}

pub struct MongoStore {
    students: StudentRepo,
    gallery: GalleryRepo,
    matches: MatchRepo,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            students: StudentRepo::new(db),
            gallery: GalleryRepo::new(db),
            matches: MatchRepo::new(db),
        }
    }
}

impl EmbeddingStore for MongoStore {
    async fn find_student(&self, student_id: &str) -> Result<Option<StudentEmbedding>> {
        self.students.find_by_student_id(student_id).await
    }

    async fn gallery_for_school(&self, school_id: Option<&str>) -> Result<Vec<GalleryImage>> {
        self.gallery.find_by_school(school_id).await
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<()> {
        self.matches.record(record).await
    }

    async fn upsert_student(&self, student: &StudentEmbedding) -> Result<bool> {
        self.students.upsert(student).await
    }
}

/// Process-local store, handy for tests and demos without MongoDB.
#[derive(Default)]
pub struct MemoryStore {
    students: DashMap<String, StudentEmbedding>,
    gallery: RwLock<Vec<GalleryImage>>,
    matches: DashMap<(String, String), MatchRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, student: StudentEmbedding) {
        self.students.insert(student.student_id.clone(), student);
    }

    pub async fn add_gallery_image(&self, image: GalleryImage) {
        self.gallery.write().await.push(image);
    }

    pub fn student(&self, student_id: &str) -> Option<StudentEmbedding> {
        self.students.get(student_id).map(|s| s.clone())
    }

    /// Recorded matches for a student, in no particular order.
    pub fn matches_for(&self, student_id: &str) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .filter(|entry| entry.key().0 == student_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl EmbeddingStore for MemoryStore {
    async fn find_student(&self, student_id: &str) -> Result<Option<StudentEmbedding>> {
        Ok(self.student(student_id))
    }

    async fn gallery_for_school(&self, school_id: Option<&str>) -> Result<Vec<GalleryImage>> {
        let gallery = self.gallery.read().await;
        Ok(gallery
            .iter()
            .filter(|img| img.school_id.as_deref() == school_id)
            .cloned()
            .collect())
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<()> {
        let key = (record.student_id.clone(), record.gallery_image_id.clone());
        self.matches.insert(key, record.clone());
        Ok(())
    }

    async fn upsert_student(&self, student: &StudentEmbedding) -> Result<bool> {
        match self.students.entry(student.student_id.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge(student);
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(student.clone());
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(school_id: Option<&str>, name: Option<&str>, embedding: Vec<f64>) -> StudentEmbedding {
        StudentEmbedding::new(
            "101".to_string(),
            school_id.map(str::to_string),
            name.map(str::to_string),
            None,
            embedding,
        )
    }

    #[tokio::test]
    async fn test_upsert_without_school_keeps_stored_school() -> Result<()> {
        let store = MemoryStore::new();
        assert!(!store.upsert_student(&student(Some("SCH-001"), Some("Asha"), vec![1.0])).await?);

        assert!(store.upsert_student(&student(None, Some("Asha K"), vec![0.5])).await?);

        let stored = store.student("101").unwrap();
        assert_eq!(stored.school_id.as_deref(), Some("SCH-001"));
        assert_eq!(stored.student_name.as_deref(), Some("Asha K"));
        assert_eq!(stored.vector_embedding, Some(vec![0.5]));
        Ok(())
    }

    #[test]
    fn test_unset_student_fields_are_not_serialized() {
        let doc = mongodb::bson::to_document(&student(None, None, vec![1.0])).unwrap();
        assert!(doc.contains_key("studentId"));
        assert!(doc.contains_key("vectorEmbedding"));
        assert!(!doc.contains_key("schoolId"));
        assert!(!doc.contains_key("studentName"));
        assert!(!doc.contains_key("referenceImage"));
        assert!(!doc.contains_key("_id"));
    }
}

use mongodb::bson::{Bson, DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A student's reference face embedding (`studentEmbedding` collection).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentEmbedding {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub student_id: String,
    // unset fields are left out so an upsert keeps what is stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_embedding: Option<Vec<f64>>,
}

impl StudentEmbedding {
    pub fn new(
        student_id: String,
        school_id: Option<String>,
        student_name: Option<String>,
        reference_image: Option<String>,
        vector_embedding: Vec<f64>,
    ) -> StudentEmbedding {
        StudentEmbedding {
            id: None,
            student_id,
            school_id,
            student_name,
            reference_image,
            vector_embedding: Some(vector_embedding),
        }
    }

    /// Overwrites the fields `update` sets and keeps the rest.
    pub fn merge(&mut self, update: &StudentEmbedding) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.school_id, &update.school_id);
        take(&mut self.student_name, &update.student_name);
        take(&mut self.reference_image, &update.reference_image);
        take(&mut self.vector_embedding, &update.vector_embedding);
    }
}

/// One photo in a school's gallery (`galleryEmbedding` collection).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    /// Either an ObjectId or a plain string, depending on who loaded the gallery.
    #[serde(rename = "_id")]
    pub id: Bson,

    pub school_id: Option<String>,
    pub image_url: Option<String>,
    #[serde(rename = "vectorgallery")]
    pub vector_gallery: Option<Vec<f64>>,
}

impl GalleryImage {
    pub fn new(
        id: impl Into<Bson>,
        school_id: Option<String>,
        image_url: Option<String>,
        vector_gallery: Option<Vec<f64>>,
    ) -> GalleryImage {
        GalleryImage {
            id: id.into(),
            school_id,
            image_url,
            vector_gallery,
        }
    }

    /// Stable textual id used when recording matches.
    pub fn gallery_id(&self) -> String {
        match &self.id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A recorded student/gallery match (`embeddedGallery` collection).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub student_id: String,
    pub school_id: Option<String>,
    pub gallery_image_id: String,
    pub image_url: String,
    pub similarity: f64,
    pub student_vector: Vec<f64>,
    pub gallery_vector: Vec<f64>,
    pub matched_at: DateTime,
}

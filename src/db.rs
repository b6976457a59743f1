use anyhow::{Context, Result};
use mongodb::options::ClientOptions;
use mongodb::{
    Client, Collection, Database as MongoDatabase,
    bson::{Bson, Document, doc, to_document},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::CONFIG;
use crate::data_models::{GalleryImage, MatchRecord, StudentEmbedding};

/// Collection names as constants for consistency
pub mod collections {
    pub const STUDENTS: &str = "studentEmbedding";
    pub const GALLERY: &str = "galleryEmbedding";
    pub const MATCHES: &str = "embeddedGallery";
}

/// Main database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Create a new Database instance with custom URI and database name.
    /// Useful for testing with a different database.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        log::info!("Connected to MongoDB database: {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Create a Database instance using environment configuration
    pub async fn from_config() -> Result<Self> {
        Self::new(&CONFIG.mongo_uri, &CONFIG.mongo_db_name).await
    }

    /// Get a typed collection by name
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    /// Get the underlying MongoDB client (for advanced operations)
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn students(&self) -> Collection<StudentEmbedding> {
        self.collection(collections::STUDENTS)
    }

    pub fn gallery(&self) -> Collection<GalleryImage> {
        self.collection(collections::GALLERY)
    }

    pub fn matches(&self) -> Collection<MatchRecord> {
        self.collection(collections::MATCHES)
    }
}

// =============================================================================
// Generic operations
// =============================================================================

pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    /// Insert a single document
    pub async fn insert(&self, doc: &T) -> Result<()> {
        self.collection
            .insert_one(doc)
            .await
            .context("Failed to insert document")?;
        Ok(())
    }

    /// Find a single document matching a filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.collection
            .find_one(filter)
            .await
            .context("Failed to find document")
    }

    /// Find all documents matching a filter
    pub async fn find(&self, filter: Document) -> Result<Vec<T>> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .await
            .context("Failed to execute find query")?;

        cursor
            .try_collect()
            .await
            .context("Failed to collect results")
    }

    /// `$set` the serialized document on the first match of `filter`, inserting
    /// it when nothing matches. Returns true if an existing document was hit.
    pub async fn upsert(&self, filter: Document, doc: &T) -> Result<bool> {
        let mut serialized = to_document(doc).context("Failed to serialize document")?;
        // _id is immutable on existing documents
        serialized.remove("_id");

        let result = self
            .collection
            .update_one(filter, doc! { "$set": serialized })
            .upsert(true)
            .await
            .context("Failed to upsert document")?;

        Ok(result.matched_count > 0)
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.collection
            .count_documents(filter)
            .await
            .context("Failed to count documents")
    }
}

// =============================================================================
// Collection-specific operations
// =============================================================================

pub struct StudentRepo {
    repo: Repository<StudentEmbedding>,
}

impl StudentRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: Repository::new(db.students()),
        }
    }

    pub async fn find_by_student_id(&self, student_id: &str) -> Result<Option<StudentEmbedding>> {
        self.repo.find_one(doc! { "studentId": student_id }).await
    }

    /// Returns true if the student was already enrolled.
    pub async fn upsert(&self, student: &StudentEmbedding) -> Result<bool> {
        self.repo
            .upsert(doc! { "studentId": &student.student_id }, student)
            .await
    }
}

pub struct GalleryRepo {
    repo: Repository<GalleryImage>,
}

impl GalleryRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: Repository::new(db.gallery()),
        }
    }

    pub async fn insert(&self, image: &GalleryImage) -> Result<()> {
        self.repo.insert(image).await
    }

    /// `None` selects images without a school, mirroring how MongoDB matches null.
    pub async fn find_by_school(&self, school_id: Option<&str>) -> Result<Vec<GalleryImage>> {
        let school: Bson = match school_id {
            Some(id) => Bson::String(id.to_string()),
            None => Bson::Null,
        };
        self.repo.find(doc! { "schoolId": school }).await
    }
}

pub struct MatchRepo {
    repo: Repository<MatchRecord>,
}

impl MatchRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: Repository::new(db.matches()),
        }
    }

    /// One record per (student, gallery image) pair.
    pub async fn record(&self, record: &MatchRecord) -> Result<()> {
        let filter = doc! {
            "studentId": &record.student_id,
            "galleryImageId": &record.gallery_image_id,
        };
        self.repo.upsert(filter, record).await?;
        Ok(())
    }

    pub async fn count_for_student(&self, student_id: &str) -> Result<u64> {
        self.repo.count(doc! { "studentId": student_id }).await
    }
}

// =============================================================================
// Test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Create a unique test database name
    pub fn unique_test_db_name() -> String {
        let count = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        format!("photofind_test_{}_{}", timestamp, count)
    }

    /// Uses MONGO_URI from environment but creates a unique test database.
    pub async fn create_test_db() -> Result<(Database, String)> {
        dotenvy::dotenv().ok();
        let uri =
            std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = unique_test_db_name();
        let db = Database::new(&uri, &db_name).await?;
        Ok((db, db_name))
    }

    pub async fn cleanup_test_db(db: &Database, db_name: &str) -> Result<()> {
        db.client()
            .database(db_name)
            .drop()
            .await
            .context("Failed to drop test database")?;
        Ok(())
    }
}

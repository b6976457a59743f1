use anyhow::{Result, bail};
use axum::{Router, http::StatusCode, routing::get};
use std::net::SocketAddr;

use photofind::data_models::StudentEmbedding;
use photofind::enroll::{EnrollOutcome, EnrollSummary, Enroller, EnrollmentRecord, FaceEmbedder};
use photofind::store::MemoryStore;

mod test_helpers {
    use super::*;

    /// Pretends every non-empty image with a leading `F` contains one face whose
    /// embedding is the byte values; `X` makes the engine fail.
    pub struct FakeEmbedder;

    impl FaceEmbedder for FakeEmbedder {
        async fn embed_faces(&self, image: Vec<u8>) -> Result<Vec<Vec<f64>>> {
            match image.first() {
                Some(b'F') => Ok(vec![image.iter().map(|b| *b as f64).collect()]),
                Some(b'X') => bail!("engine exploded"),
                _ => Ok(vec![]),
            }
        }
    }

    /// Serves a few fixed "photos" on an ephemeral port.
    pub async fn photo_server() -> Result<SocketAddr> {
        let app = Router::new()
            .route("/face.jpg", get(|| async { "FAB" }))
            .route("/face2.jpg", get(|| async { "FZ" }))
            .route("/landscape.jpg", get(|| async { "no people" }))
            .route("/broken.jpg", get(|| async { "X" }))
            .route("/empty.jpg", get(|| async { "" }))
            .route("/missing.jpg", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(addr)
    }

    pub fn record(addr: SocketAddr, id: &str, photo: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            student_id: id.to_string(),
            name: format!("Student {id}"),
            school_id: Some("SCH-001".to_string()),
            photo_url: format!("http://{addr}/{photo}"),
        }
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_enroll_new_student() -> Result<()> {
    let addr = photo_server().await?;
    let enroller = Enroller::new(FakeEmbedder, MemoryStore::new())?;

    let outcome = enroller.process_student(&record(addr, "101", "face.jpg")).await?;
    assert_eq!(outcome, EnrollOutcome::Created);

    let student = enroller.store().student("101").unwrap();
    assert_eq!(student.vector_embedding, Some(vec![70.0, 65.0, 66.0]));
    assert_eq!(student.school_id.as_deref(), Some("SCH-001"));
    assert_eq!(student.student_name.as_deref(), Some("Student 101"));
    assert_eq!(
        student.reference_image,
        Some(format!("http://{addr}/face.jpg"))
    );
    Ok(())
}

#[tokio::test]
async fn test_enroll_existing_student_updates_embedding() -> Result<()> {
    let addr = photo_server().await?;
    let store = MemoryStore::new();
    store.add_student(StudentEmbedding::new(
        "101".to_string(),
        Some("SCH-001".to_string()),
        Some("Old Name".to_string()),
        None,
        vec![0.0, 0.0],
    ));
    let enroller = Enroller::new(FakeEmbedder, store)?;

    let outcome = enroller.process_student(&record(addr, "101", "face2.jpg")).await?;
    assert_eq!(outcome, EnrollOutcome::Updated);

    let student = enroller.store().student("101").unwrap();
    assert_eq!(student.vector_embedding, Some(vec![70.0, 90.0]));
    assert_eq!(student.student_name.as_deref(), Some("Student 101"));
    Ok(())
}

#[tokio::test]
async fn test_reenroll_without_school_keeps_school() -> Result<()> {
    let addr = photo_server().await?;
    let store = MemoryStore::new();
    store.add_student(StudentEmbedding::new(
        "101".to_string(),
        Some("SCH-001".to_string()),
        Some("Old Name".to_string()),
        None,
        vec![0.0, 0.0],
    ));
    let enroller = Enroller::new(FakeEmbedder, store)?;

    let mut without_school = record(addr, "101", "face2.jpg");
    without_school.school_id = None;
    let outcome = enroller.process_student(&without_school).await?;
    assert_eq!(outcome, EnrollOutcome::Updated);

    let student = enroller.store().student("101").unwrap();
    assert_eq!(student.school_id.as_deref(), Some("SCH-001"));
    assert_eq!(student.vector_embedding, Some(vec![70.0, 90.0]));
    Ok(())
}

#[tokio::test]
async fn test_no_face_is_skipped() -> Result<()> {
    let addr = photo_server().await?;
    let enroller = Enroller::new(FakeEmbedder, MemoryStore::new())?;

    let outcome = enroller.process_student(&record(addr, "102", "landscape.jpg")).await?;
    assert_eq!(outcome, EnrollOutcome::NoFace);
    assert!(enroller.store().student("102").is_none());
    Ok(())
}

#[tokio::test]
async fn test_download_failures_are_not_fatal() -> Result<()> {
    let addr = photo_server().await?;
    let enroller = Enroller::new(FakeEmbedder, MemoryStore::new())?;

    for photo in ["missing.jpg", "empty.jpg"] {
        let outcome = enroller.process_student(&record(addr, "103", photo)).await?;
        assert_eq!(outcome, EnrollOutcome::DownloadFailed);
    }
    assert!(enroller.store().student("103").is_none());
    Ok(())
}

#[tokio::test]
async fn test_engine_error_propagates() -> Result<()> {
    let addr = photo_server().await?;
    let enroller = Enroller::new(FakeEmbedder, MemoryStore::new())?;

    let err = enroller
        .process_student(&record(addr, "104", "broken.jpg"))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("engine exploded"));
    Ok(())
}

#[tokio::test]
async fn test_enroll_all_summary() -> Result<()> {
    let addr = photo_server().await?;
    let store = MemoryStore::new();
    store.add_student(StudentEmbedding::new(
        "2".to_string(),
        None,
        None,
        None,
        vec![1.0],
    ));
    let enroller = Enroller::new(FakeEmbedder, store)?;

    let records = vec![
        record(addr, "1", "face.jpg"),
        record(addr, "2", "face2.jpg"),
        record(addr, "3", "landscape.jpg"),
        record(addr, "4", "missing.jpg"),
        record(addr, "5", "broken.jpg"),
    ];
    let summary = enroller.enroll_all(&records, 2).await;

    assert_eq!(
        summary,
        EnrollSummary {
            created: 1,
            updated: 1,
            skipped: 1,
            failed: 2,
        }
    );
    Ok(())
}

//! File lifecycle tests.
//!
//! Drives the service end to end against a file-backed database: upload,
//! list, download, delete, expiry and persistence across reopen.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use filebay::file::{FileService, FileStorage, ListQuery, UploadFile, UploadPolicy};
use filebay::id::{sequence_of, timestamp_of};
use filebay::{Config, Database, FileStatus, FilebayError, IdGenerator};
use tempfile::TempDir;

const CONFIG: &str = r#"
[files]
max_size = 1024
allowed_types = "txt, pdf"
retention_days = 7
"#;

async fn open_service(temp_dir: &TempDir) -> FileService {
    let config = Config::parse(CONFIG).unwrap();
    config.validate().unwrap();

    let db = Database::open(temp_dir.path().join("db").join("filebay.db"))
        .await
        .unwrap();

    FileService::new(
        Arc::new(db),
        FileStorage::new(temp_dir.path().join("uploads")),
        Arc::new(IdGenerator::new()),
    )
    .with_policy(UploadPolicy::from_config(&config.files))
}

#[tokio::test]
async fn test_full_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(&temp_dir).await;

    // upload
    let records = service
        .upload(vec![
            UploadFile::from_bytes("alpha.txt", b"alpha".to_vec()),
            UploadFile::from_bytes("beta.pdf", b"beta".to_vec()),
        ])
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(timestamp_of(records[0].id) > 0);
    assert!(records[1].id > records[0].id);
    assert!(sequence_of(records[1].id) < 1 << 22);

    // list
    let page = service.list_files(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 1);

    // download
    let content = service.download(&records[1].file_name).await.unwrap();
    assert_eq!(content, b"beta");

    // delete one
    assert_eq!(service.delete_by_ids(&[records[0].id]).await.unwrap(), 1);
    assert!(!Path::new(&records[0].file_path).exists());
    assert!(matches!(
        service.download(&records[0].file_name).await,
        Err(FilebayError::NotFound(_))
    ));

    let page = service.list_files(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, records[1].id);

    // the removed row is kept
    let removed = service.get_file(records[0].id).await.unwrap();
    assert_eq!(removed.status, FileStatus::Removed);
}

#[tokio::test]
async fn test_sweep_with_zero_ttl_expires_everything_older() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(&temp_dir).await;
    let records = service
        .upload(vec![UploadFile::from_bytes("short.txt", b"x".to_vec())])
        .await
        .unwrap();
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    let report = service.sweep_expired(Duration::zero()).await;

    assert_eq!(report.scanned, 1);
    assert_eq!(report.removed, 1);
    assert!(!Path::new(&records[0].file_path).exists());
    assert!(matches!(
        service.download(&records[0].file_name).await,
        Err(FilebayError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_default_retention_keeps_fresh_files() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(&temp_dir).await;
    service
        .upload(vec![UploadFile::from_bytes("fresh.txt", b"x".to_vec())])
        .await
        .unwrap();

    let report = service
        .sweep_expired(Duration::days(filebay::file::DEFAULT_RETENTION_DAYS))
        .await;

    assert_eq!(report.scanned, 0);
    let page = service.list_files(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let record = {
        let service = open_service(&temp_dir).await;
        service
            .upload(vec![UploadFile::from_bytes("keep.txt", b"persist".to_vec())])
            .await
            .unwrap()
            .remove(0)
    };

    let service = open_service(&temp_dir).await;

    assert_eq!(service.get_file(record.id).await.unwrap(), record);
    assert_eq!(
        service.download(&record.file_name).await.unwrap(),
        b"persist"
    );
}

#[tokio::test]
async fn test_upload_policy_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(&temp_dir).await;

    let upper = service
        .upload(vec![UploadFile::from_bytes("SCAN.PDF", b"%PDF".to_vec())])
        .await;
    let image = service
        .upload(vec![UploadFile::from_bytes("photo.png", b"png".to_vec())])
        .await;
    let big = service
        .upload(vec![UploadFile::from_bytes("big.txt", vec![0u8; 1025])])
        .await;

    assert!(upper.is_ok());
    assert!(matches!(image, Err(FilebayError::Validation(_))));
    assert!(matches!(big, Err(FilebayError::Validation(_))));
}

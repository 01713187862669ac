//! Concurrency tests for filebay.
//!
//! These tests run uploads, deletes and id generation from many tasks at
//! once and check that ids stay unique and counts stay consistent.

use std::collections::HashSet;
use std::sync::Arc;

use filebay::file::{FileService, FileStorage, ListQuery, UploadFile, UploadPolicy};
use filebay::{Database, FileStatus, IdGenerator};
use tempfile::TempDir;

/// Build a service over the given database and a temp upload dir.
fn build_service(db: Database, temp_dir: &TempDir) -> FileService {
    FileService::new(
        Arc::new(db),
        FileStorage::new(temp_dir.path().join("uploads")),
        Arc::new(IdGenerator::new()),
    )
    .with_policy(UploadPolicy::new(4096, "txt"))
}

async fn setup_in_memory() -> (FileService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open_in_memory().await.unwrap();
    (build_service(db, &temp_dir), temp_dir)
}

/// Test concurrent uploads from many tasks.
///
/// Every upload should succeed with a distinct id and its own blob.
#[tokio::test]
async fn test_concurrent_uploads_get_distinct_ids() {
    let (service, temp_dir) = setup_in_memory().await;
    const NUM_UPLOADS: usize = 40;

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .upload(vec![UploadFile::from_bytes(
                    format!("file{i}.txt"),
                    format!("content {i}").into_bytes(),
                )])
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let records = handle.await.unwrap().unwrap();
        for record in records {
            assert!(ids.insert(record.id), "duplicate id {}", record.id);
        }
    }
    assert_eq!(ids.len(), NUM_UPLOADS);

    let page = service
        .list_files(&ListQuery::new(1, 100, None))
        .await
        .unwrap();
    assert_eq!(page.total, NUM_UPLOADS as u64);

    let blobs = std::fs::read_dir(temp_dir.path().join("uploads"))
        .unwrap()
        .count();
    assert_eq!(blobs, NUM_UPLOADS);
}

/// Test concurrent uploads against a file-backed database.
#[tokio::test]
async fn test_concurrent_uploads_file_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("filebay.db"))
        .await
        .unwrap();
    let service = build_service(db, &temp_dir);
    const NUM_TASKS: usize = 10;
    const FILES_PER_TASK: usize = 3;

    let mut handles = Vec::new();
    for task in 0..NUM_TASKS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let batch = (0..FILES_PER_TASK)
                .map(|n| UploadFile::from_bytes(format!("t{task}_{n}.txt"), b"data".to_vec()))
                .collect();
            service.upload(batch).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        for record in handle.await.unwrap().unwrap() {
            assert!(ids.insert(record.id));
        }
    }

    assert_eq!(ids.len(), NUM_TASKS * FILES_PER_TASK);
    let page = service.list_files(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, (NUM_TASKS * FILES_PER_TASK) as u64);
}

/// Test overlapping deletes of the same ids.
///
/// Each record changes to removed exactly once, so the counts over all
/// tasks add up to the number of records.
#[tokio::test]
async fn test_concurrent_deletes_count_each_file_once() {
    let (service, _temp_dir) = setup_in_memory().await;
    let batch = (0..20)
        .map(|i| UploadFile::from_bytes(format!("d{i}.txt"), b"x".to_vec()))
        .collect();
    let records = service.upload(batch).await.unwrap();
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = service.clone();
        let ids = ids.clone();
        handles.push(tokio::spawn(
            async move { service.delete_by_ids(&ids).await },
        ));
    }

    let mut total_deleted = 0;
    for handle in handles {
        total_deleted += handle.await.unwrap().unwrap();
    }

    assert_eq!(total_deleted, ids.len() as u64);
    for id in ids {
        assert_eq!(
            service.get_file(id).await.unwrap().status,
            FileStatus::Removed
        );
    }
}

/// Test that one generator shared across tokio tasks never repeats.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_generator_across_tasks() {
    let generator = Arc::new(IdGenerator::new());
    const TASKS: usize = 16;
    const PER_TASK: usize = 2_000;

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let generator = Arc::clone(&generator);
        handles.push(tokio::spawn(async move {
            (0..PER_TASK).map(|_| generator.next_id()).collect::<Vec<_>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let ids = handle.await.unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), TASKS * PER_TASK);
}

use datasphere_core::db::{begin, open_db_in_memory, TxMode};
use datasphere_core::{
    Chunk, ChunkRepository, ErrorKind, FileRepository, NewChunk, NewFile, SqliteChunkRepository,
    SqliteFileRepository,
};
use rusqlite::Connection;

const REQUEST_ID: &str = "chunk-repo-test";

/// Creates the music (id 1) and video (id 2) files.
fn seed_files(conn: &mut Connection) {
    let files = SqliteFileRepository::new();
    let tx = begin(conn, TxMode::Write).unwrap();
    files
        .create_file(&tx, &NewFile::new("fake_music.mp3", 1024, "Music file", 3), REQUEST_ID)
        .unwrap();
    files
        .create_file(&tx, &NewFile::new("fake_video.mp4", 2048, "Video file", 7), REQUEST_ID)
        .unwrap();
    tx.commit().unwrap();
}

fn seed_chunks(conn: &mut Connection, chunks: &[NewChunk]) -> Vec<i64> {
    let repo = SqliteChunkRepository::new();
    let tx = begin(conn, TxMode::Write).unwrap();
    let ids = chunks
        .iter()
        .map(|chunk| repo.create_chunk(&tx, chunk, REQUEST_ID).unwrap())
        .collect();
    tx.commit().unwrap();
    ids
}

fn seeded_conn() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);
    seed_chunks(
        &mut conn,
        &[
            NewChunk::new("testid1", 1, 1),
            NewChunk::new("testid2", 2, 1),
            NewChunk::new("testid3", 3, 1),
            NewChunk::new("testid1", 1, 2),
            NewChunk::new("testid2", 2, 2),
        ],
    );
    conn
}

fn chunk(id: i64, file_id: &str, chunk_number: u32, file_key: i64) -> Chunk {
    Chunk {
        id,
        file_id: file_id.to_string(),
        chunk_number,
        file_key,
    }
}

#[test]
fn create_assigns_sequential_ids() {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);

    let ids = seed_chunks(
        &mut conn,
        &[
            NewChunk::new("testid1", 1, 1),
            NewChunk::new("testid2", 2, 1),
            NewChunk::new("testid1", 1, 2),
        ],
    );
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn create_with_missing_field_fails_validation() {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Write).unwrap();

    let cases = [
        (
            NewChunk {
                file_id: None,
                ..NewChunk::new("x", 1, 1)
            },
            "file_id",
        ),
        (
            NewChunk {
                chunk_number: None,
                ..NewChunk::new("testid", 1, 1)
            },
            "chunk_number",
        ),
        (
            NewChunk {
                file_key: None,
                ..NewChunk::new("testid", 1, 1)
            },
            "file_key",
        ),
        (
            NewChunk {
                file_id: Some("  ".to_string()),
                ..NewChunk::new("x", 1, 1)
            },
            "file_id",
        ),
    ];

    for (input, field) in cases {
        let err = repo.create_chunk(&tx, &input, REQUEST_ID).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains(field));
    }
}

#[test]
fn create_with_unknown_file_key_violates_foreign_key() {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Write).unwrap();

    let err = repo
        .create_chunk(&tx, &NewChunk::new("testid", 1, 100), REQUEST_ID)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status_code(), 400);
    assert_eq!(
        err.message(),
        "failed to create new chunk: FOREIGN KEY constraint failed"
    );
}

#[test]
fn list_returns_total_and_ordered_page() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let page = repo.list_file_chunks(&tx, 1, 10, 0, REQUEST_ID).unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(
        page.chunks,
        vec![
            chunk(1, "testid1", 1, 1),
            chunk(2, "testid2", 2, 1),
            chunk(3, "testid3", 3, 1),
        ]
    );

    let page = repo.list_file_chunks(&tx, 2, 10, 0, REQUEST_ID).unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(
        page.chunks,
        vec![chunk(4, "testid1", 1, 2), chunk(5, "testid2", 2, 2)]
    );
}

#[test]
fn list_orders_by_chunk_number_regardless_of_insertion_order() {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);
    seed_chunks(
        &mut conn,
        &[
            NewChunk::new("third", 3, 1),
            NewChunk::new("first", 1, 1),
            NewChunk::new("second", 2, 1),
        ],
    );
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let page = repo.list_file_chunks(&tx, 1, 10, 0, REQUEST_ID).unwrap();
    let numbers: Vec<u32> = page.chunks.iter().map(|c| c.chunk_number).collect();
    let remote_ids: Vec<&str> = page.chunks.iter().map(|c| c.file_id.as_str()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(remote_ids, vec!["first", "second", "third"]);
}

#[test]
fn list_with_limit_keeps_full_total() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let page = repo.list_file_chunks(&tx, 1, 2, 0, REQUEST_ID).unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(
        page.chunks,
        vec![chunk(1, "testid1", 1, 1), chunk(2, "testid2", 2, 1)]
    );
}

#[test]
fn list_with_offset_skips_leading_chunks() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let page = repo.list_file_chunks(&tx, 1, 10, 1, REQUEST_ID).unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(
        page.chunks,
        vec![chunk(2, "testid2", 2, 1), chunk(3, "testid3", 3, 1)]
    );
}

#[test]
fn list_for_unknown_file_is_not_found() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let err = repo.list_file_chunks(&tx, 100, 100, 0, REQUEST_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "file chunks not found");
}

#[test]
fn list_for_file_without_chunks_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    seed_files(&mut conn);
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let err = repo.list_file_chunks(&tx, 1, 10, 0, REQUEST_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn list_past_last_page_is_not_found() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let err = repo.list_file_chunks(&tx, 1, 10, 3, REQUEST_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn list_with_zero_limit_fails_validation() {
    let mut conn = seeded_conn();
    let repo = SqliteChunkRepository::new();
    let tx = begin(&mut conn, TxMode::Read).unwrap();

    let err = repo.list_file_chunks(&tx, 1, 0, 0, REQUEST_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn deleting_file_cascades_to_chunks() {
    let mut conn = seeded_conn();
    let files = SqliteFileRepository::new();
    let chunks = SqliteChunkRepository::new();

    let tx = begin(&mut conn, TxMode::Write).unwrap();
    files.delete_file(&tx, 1, REQUEST_ID).unwrap();
    tx.commit().unwrap();

    let tx = begin(&mut conn, TxMode::Read).unwrap();
    let err = chunks.list_file_chunks(&tx, 1, 10, 0, REQUEST_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        chunks.list_file_chunks(&tx, 2, 10, 0, REQUEST_ID).unwrap().count,
        2
    );
}

#![cfg(feature = "sqlite")]

use sql_datasync::prelude::*;
use sql_datasync::sync;
use tokio::runtime::Runtime;

async fn sqlite_handle(
    name: &str,
    dir: &tempfile::TempDir,
    chunk_size: usize,
) -> Result<DbHandle, SqlDataSyncError> {
    let path = dir.path().join(format!("{name}.db"));
    let config = DbInstanceConfig::sqlite(path.to_string_lossy().into_owned())
        .with_chunk_size(chunk_size);
    DbHandle::from_config(name, &config).await
}

async fn seed_numbers(handle: &DbHandle, count: i64) -> Result<(), SqlDataSyncError> {
    let tx = handle.begin().await?;
    tx.execute_script("CREATE TABLE numbers (n INTEGER)").await?;
    for n in 1..=count {
        tx.execute("INSERT INTO numbers (n) VALUES (?1)", &[RowValues::Int(n)])
            .await?;
    }
    tx.commit().await
}

#[test]
fn chunks_cover_the_table_without_duplicates_or_gaps()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir, 4).await?;
        seed_numbers(&db, 10).await?;

        let tx = db.begin().await?;
        let mut chunks = tx
            .query_chunked("SELECT n FROM numbers ORDER BY n", &[])
            .await?;

        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        while let Some(chunk) = chunks.next_chunk().await? {
            sizes.push(chunk.len());
            for row in &chunk.results {
                seen.push(*row.get("n").and_then(RowValues::as_int).unwrap());
            }
        }
        drop(chunks);
        tx.commit().await?;

        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(seen, (1..=10).collect::<Vec<i64>>());

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn chunked_query_carries_caller_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir, 3).await?;
        seed_numbers(&db, 10).await?;

        let tx = db.begin().await?;
        let chunks = tx
            .query_chunked(
                "SELECT n FROM numbers WHERE n > ?1 ORDER BY n",
                &[RowValues::Int(6)],
            )
            .await?;
        let all = chunks.collect_all().await?;
        tx.commit().await?;

        let seen: Vec<i64> = all
            .results
            .iter()
            .map(|row| *row.get("n").and_then(RowValues::as_int).unwrap())
            .collect();
        assert_eq!(seen, vec![7, 8, 9, 10]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn empty_query_yields_no_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir, 4).await?;
        seed_numbers(&db, 0).await?;

        let tx = db.begin().await?;
        let mut chunks = tx.read_table_chunked("numbers").await?;
        assert!(chunks.next_chunk().await?.is_none());
        drop(chunks);
        tx.commit().await?;

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn abandoning_a_stream_leaves_the_transaction_usable()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir, 4).await?;
        seed_numbers(&db, 10).await?;

        let tx = db.begin().await?;
        let mut chunks = tx.read_table_chunked("numbers").await?;
        let first = chunks.next_chunk().await?.expect("first chunk");
        assert_eq!(first.len(), 4);
        drop(chunks);

        // The transaction is still good for more work, then for rollback.
        let count = tx
            .query_first_value("SELECT COUNT(*) FROM numbers", &[])
            .await?;
        assert_eq!(count.as_int(), Some(&10));
        tx.rollback().await?;

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn table_chunks_stay_in_rowid_order_after_churn() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir, 3).await?;
        seed_numbers(&db, 6).await?;

        // Deletes followed by inserts reuse freed rowids, so physical order
        // no longer matches insertion order.
        let tx = db.begin().await?;
        tx.execute("DELETE FROM numbers WHERE n IN (2, 5)", &[]).await?;
        tx.execute("INSERT INTO numbers (n) VALUES (?1)", &[RowValues::Int(7)])
            .await?;
        tx.execute("INSERT INTO numbers (n) VALUES (?1)", &[RowValues::Int(8)])
            .await?;
        tx.commit().await?;

        let tx = db.begin().await?;
        let expected: Vec<i64> = tx
            .query("SELECT n FROM numbers ORDER BY rowid", &[])
            .await?
            .results
            .iter()
            .map(|row| *row.get("n").and_then(RowValues::as_int).unwrap())
            .collect();

        let mut chunks = tx.read_table_chunked("numbers").await?;
        let mut seen = Vec::new();
        while let Some(chunk) = chunks.next_chunk().await? {
            for row in &chunk.results {
                seen.push(*row.get("n").and_then(RowValues::as_int).unwrap());
            }
        }
        drop(chunks);
        tx.commit().await?;

        assert_eq!(seen.len(), 6);
        assert_eq!(seen, expected);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn zero_chunk_size_is_rejected_at_construction() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let path = dir.path().join("zero.db");
        let config = DbInstanceConfig::sqlite(path.to_string_lossy().into_owned())
            .with_chunk_size(0);
        let err = DbHandle::from_config("zero", &config)
            .await
            .expect_err("zero rows per chunk can never make progress");
        assert!(matches!(err, SqlDataSyncError::ConfigError(_)), "{err}");

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn copy_streams_in_chunks_across_handles() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        // 5 rows through chunks of 2: two full chunks and a remainder.
        let src = sqlite_handle("src", &dir, 2).await?;
        let dest = sqlite_handle("dest", &dir, 2).await?;
        seed_numbers(&src, 5).await?;

        sync::copy_table(&src, &dest, "numbers", "numbers", IfExists::Replace).await?;

        let tx = dest.begin().await?;
        let rs = tx.query("SELECT n FROM numbers ORDER BY n", &[]).await?;
        tx.commit().await?;
        let seen: Vec<i64> = rs
            .results
            .iter()
            .map(|row| *row.get("n").and_then(RowValues::as_int).unwrap())
            .collect();
        assert_eq!(seen, (1..=5).collect::<Vec<i64>>());

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

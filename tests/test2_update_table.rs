#![cfg(feature = "sqlite")]

use sql_datasync::prelude::*;
use sql_datasync::{registry, sync};
use tokio::runtime::Runtime;

async fn sqlite_handle(
    name: &str,
    dir: &tempfile::TempDir,
) -> Result<DbHandle, SqlDataSyncError> {
    let path = dir.path().join(format!("{name}.db"));
    DbHandle::from_config(
        name,
        &DbInstanceConfig::sqlite(path.to_string_lossy().into_owned()),
    )
    .await
}

async fn seed_readings(handle: &DbHandle, ids: &[i64]) -> Result<(), SqlDataSyncError> {
    let tx = handle.begin().await?;
    tx.execute_script("CREATE TABLE readings (id INTEGER, payload TEXT)")
        .await?;
    tx.commit().await?;
    insert_readings(handle, ids).await
}

async fn insert_readings(handle: &DbHandle, ids: &[i64]) -> Result<(), SqlDataSyncError> {
    let tx = handle.begin().await?;
    for id in ids {
        tx.execute(
            "INSERT INTO readings (id, payload) VALUES (?1, ?2)",
            &[RowValues::Int(*id), RowValues::Text(format!("r{id}"))],
        )
        .await?;
    }
    tx.commit().await
}

async fn read_ids(handle: &DbHandle, table: &str) -> Result<Vec<i64>, SqlDataSyncError> {
    let tx = handle.begin().await?;
    let rs = tx
        .query(&format!("SELECT id FROM \"{table}\" ORDER BY id"), &[])
        .await?;
    tx.commit().await?;
    Ok(rs
        .results
        .iter()
        .filter_map(|row| row.get("id").and_then(RowValues::as_int).copied())
        .collect())
}

#[test]
fn missing_destination_is_bootstrapped_with_a_full_copy() -> Result<(), Box<dyn std::error::Error>>
{
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let src = sqlite_handle("src", &dir).await?;
        let dest = sqlite_handle("dest", &dir).await?;
        seed_readings(&src, &[1, 2, 3]).await?;

        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Ge).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3]);

        // An existing but empty destination takes the same path.
        let tx = dest.begin().await?;
        tx.execute("DELETE FROM readings", &[]).await?;
        tx.commit().await?;
        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Ge).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn non_strict_reruns_converge_even_with_duplicate_boundary_keys()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let src = sqlite_handle("src", &dir).await?;
        let dest = sqlite_handle("dest", &dir).await?;
        // Two rows share the top key value.
        seed_readings(&src, &[1, 2, 3, 3]).await?;

        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Ge).await?;
        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Ge).await?;
        // The watermark rows were deleted and re-copied, not duplicated.
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3, 3]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn strict_direction_skips_watermark_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let src = sqlite_handle("src", &dir).await?;
        let dest = sqlite_handle("dest", &dir).await?;
        seed_readings(&src, &[1, 2, 3]).await?;

        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Gt).await?;
        // No source changes, so a strict rerun moves nothing.
        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Gt).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3]);

        // Only rows past the watermark move.
        insert_readings(&src, &[4, 5]).await?;
        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Gt).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3, 4, 5]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn descending_directions_advance_from_the_min_watermark()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let src = sqlite_handle("src", &dir).await?;
        let dest = sqlite_handle("dest", &dir).await?;
        seed_readings(&src, &[5, 4, 3]).await?;

        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Lt).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![3, 4, 5]);

        insert_readings(&src, &[2, 1]).await?;
        sync::update_table(&src, &dest, "readings", "readings", "id", KeyDir::Lt).await?;
        assert_eq!(read_ids(&dest, "readings").await?, vec![1, 2, 3, 4, 5]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn update_within_one_handle_stays_server_side() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let db = sqlite_handle("work", &dir).await?;
        seed_readings(&db, &[1, 2, 3]).await?;

        sync::update_table(&db, &db, "readings", "readings_mirror", "id", KeyDir::Ge).await?;
        assert_eq!(read_ids(&db, "readings_mirror").await?, vec![1, 2, 3]);

        insert_readings(&db, &[4]).await?;
        sync::update_table(&db, &db, "readings", "readings_mirror", "id", KeyDir::Ge).await?;
        assert_eq!(read_ids(&db, "readings_mirror").await?, vec![1, 2, 3, 4]);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn bad_key_dir_is_rejected_before_any_lookup() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;

    rt.block_on(async {
        // Neither instance name is registered; the argument check fires
        // first, so no ConfigError surfaces.
        let err = registry::update_table("no_such_src", "t", "no_such_dest", None, "id", "!=")
            .await
            .expect_err("!= is not a key direction");
        assert!(matches!(err, SqlDataSyncError::InvalidArgument(_)), "{err}");

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#![cfg(feature = "sqlite")]

use sql_datasync::prelude::*;
use sql_datasync::registry;
use tokio::runtime::Runtime;

fn sqlite_config(name: &str, dir: &tempfile::TempDir) -> DbInstanceConfig {
    let path = dir.path().join(format!("{name}.db"));
    DbInstanceConfig::sqlite(path.to_string_lossy().into_owned())
}

#[test]
fn handles_are_built_lazily_and_shared() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    registry::register_config("reg_lazy", sqlite_config("reg_lazy", &dir));

    rt.block_on(async {
        registry::execute_script(
            "reg_lazy",
            "CREATE TABLE jobs (id INTEGER, state TEXT);
             INSERT INTO jobs VALUES (1, 'queued');
             INSERT INTO jobs VALUES (2, 'queued');",
        )
        .await?;

        let changed = registry::execute(
            "reg_lazy",
            "UPDATE jobs SET state = ?1 WHERE id = ?2",
            &[RowValues::Text("done".into()), RowValues::Int(1)],
        )
        .await?;
        assert_eq!(changed, 1);

        let state = registry::query_first_value(
            "reg_lazy",
            "SELECT state FROM jobs WHERE id = ?1",
            &[RowValues::Int(1)],
        )
        .await?;
        assert_eq!(state.as_text(), Some("done"));

        // Both lookups resolve to the same pool.
        let a = registry::lookup("reg_lazy").await?;
        let b = registry::lookup("reg_lazy").await?;
        assert_eq!(a.name(), b.name());

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn unknown_instance_names_are_config_errors() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;

    rt.block_on(async {
        let err = registry::lookup("reg_never_registered")
            .await
            .expect_err("nothing registered under that name");
        assert!(matches!(err, SqlDataSyncError::ConfigError(_)), "{err}");

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn first_row_helpers_enforce_result_shape() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    registry::register_config("reg_shape", sqlite_config("reg_shape", &dir));

    rt.block_on(async {
        registry::execute_script(
            "reg_shape",
            "CREATE TABLE pairs (a INTEGER, b INTEGER);
             INSERT INTO pairs VALUES (1, 2);",
        )
        .await?;

        let err = registry::query_first("reg_shape", "SELECT a FROM pairs WHERE a > 100", &[])
            .await
            .expect_err("no rows match");
        assert!(matches!(err, SqlDataSyncError::EmptyResult(_)), "{err}");

        // Lenient form takes the first column of a wide row.
        let value =
            registry::query_first_value("reg_shape", "SELECT a, b FROM pairs", &[]).await?;
        assert_eq!(value.as_int(), Some(&1));

        // The strict form rejects it.
        let db = registry::lookup("reg_shape").await?;
        let tx = db.begin().await?;
        let err = tx
            .query_first_value_strict("SELECT a, b FROM pairs", &[])
            .await
            .expect_err("two columns");
        assert!(matches!(err, SqlDataSyncError::ShapeError(_)), "{err}");
        tx.commit().await?;

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn registry_copy_defaults_the_destination_table_name()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    registry::register_config("reg_copy_src", sqlite_config("reg_copy_src", &dir));
    registry::register_config("reg_copy_dest", sqlite_config("reg_copy_dest", &dir));

    rt.block_on(async {
        registry::execute_script(
            "reg_copy_src",
            "CREATE TABLE metrics (id INTEGER, v REAL);
             INSERT INTO metrics VALUES (1, 0.5);
             INSERT INTO metrics VALUES (2, 1.5);",
        )
        .await?;

        registry::copy_table(
            "reg_copy_src",
            "metrics",
            "reg_copy_dest",
            None,
            IfExists::Replace,
        )
        .await?;

        let rs = registry::read_table("reg_copy_dest", "metrics").await?;
        assert_eq!(rs.len(), 2);

        registry::update_table("reg_copy_src", "metrics", "reg_copy_dest", None, "id", ">")
            .await?;
        let rs = registry::read_table("reg_copy_dest", "metrics").await?;
        assert_eq!(rs.len(), 2);

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn prebuilt_handles_can_be_registered_directly() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    rt.block_on(async {
        let handle =
            DbHandle::new_sqlite("reg_prebuilt", &sqlite_config("reg_prebuilt", &dir)).await?;
        registry::register_handle(handle);

        // No config was registered under this name; the handle itself
        // serves every lookup.
        registry::execute_script(
            "reg_prebuilt",
            "CREATE TABLE t (id INTEGER);
             INSERT INTO t VALUES (7);",
        )
        .await?;
        let value = registry::query_first_value("reg_prebuilt", "SELECT id FROM t", &[]).await?;
        assert_eq!(value.as_int(), Some(&7));

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

async fn row_count(executor: &impl SqlExecutor, table: &str) -> Result<i64, SqlDataSyncError> {
    let rs = executor
        .query(&format!("SELECT COUNT(*) AS n FROM \"{table}\""), &[])
        .await?;
    Ok(*rs.results[0].get("n").and_then(RowValues::as_int).unwrap())
}

#[test]
fn transactions_can_be_driven_through_the_executor_trait()
-> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    registry::register_config("reg_exec", sqlite_config("reg_exec", &dir));

    rt.block_on(async {
        let db = registry::lookup("reg_exec").await?;
        let tx = db.begin().await?;
        SqlExecutor::execute_script(&tx, "CREATE TABLE t (id INTEGER)").await?;
        SqlExecutor::execute(&tx, "INSERT INTO t VALUES (?1)", &[RowValues::Int(1)]).await?;
        SqlExecutor::execute(&tx, "INSERT INTO t VALUES (?1)", &[RowValues::Int(2)]).await?;

        // Generic code sees the same transaction through the trait.
        assert_eq!(row_count(&tx, "t").await?, 2);
        tx.commit().await?;

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

#[test]
fn views_can_be_created_but_never_appended() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;

    registry::register_config("reg_views", sqlite_config("reg_views", &dir));

    rt.block_on(async {
        registry::execute_script(
            "reg_views",
            "CREATE TABLE raw (id INTEGER, ok INTEGER);
             INSERT INTO raw VALUES (1, 1);
             INSERT INTO raw VALUES (2, 0);",
        )
        .await?;

        registry::create_view(
            "reg_views",
            "raw_ok",
            "SELECT id FROM raw WHERE ok = 1",
            &[],
            IfExists::Replace,
        )
        .await?;
        let rs = registry::query("reg_views", "SELECT id FROM raw_ok", &[]).await?;
        assert_eq!(rs.len(), 1);

        let err = registry::create_view(
            "reg_views",
            "raw_ok",
            "SELECT id FROM raw",
            &[],
            IfExists::Append,
        )
        .await
        .expect_err("append is meaningless for a view");
        assert!(matches!(err, SqlDataSyncError::InvalidArgument(_)), "{err}");

        let err = registry::create_view(
            "reg_views",
            "raw_ok",
            "SELECT id FROM raw",
            &[],
            IfExists::Fail,
        )
        .await
        .expect_err("view already exists");
        assert!(matches!(err, SqlDataSyncError::TableExists(_)), "{err}");

        Ok::<(), SqlDataSyncError>(())
    })?;
    Ok(())
}

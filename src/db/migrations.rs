use diesel::prelude::*;
use diesel::sql_types::Text;

use super::DatabaseError;

#[cfg(feature = "sqlite")]
use chrono::Utc;

/// A schema migration embedded in the binary. `up` is raw DDL written for
/// the backend it will run against.
pub struct Migration {
    pub version: &'static str,
    pub name: &'static str,
    pub up: &'static str,
}

/// Embedded migrations, applied oldest-first by version. The scaffold ships
/// with none; the runner still provisions its bookkeeping table so the
/// first real migration slots in cleanly.
pub const MIGRATIONS: &[Migration] = &[];

#[derive(QueryableByName)]
struct AppliedVersion {
    #[diesel(sql_type = Text)]
    version: String,
}

#[cfg(feature = "sqlite")]
pub fn run_sqlite(
    conn: &mut diesel::sqlite::SqliteConnection,
    migrations: &[Migration],
) -> Result<usize, DatabaseError> {
    diesel::sql_query(
        "CREATE TABLE IF NOT EXISTS schema_migrations ( \
         version TEXT PRIMARY KEY, \
         name TEXT NOT NULL, \
         applied_at TEXT NOT NULL )",
    )
    .execute(conn)
    .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    let applied: Vec<AppliedVersion> =
        diesel::sql_query("SELECT version FROM schema_migrations ORDER BY version")
            .load(conn)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

    let mut count = 0;
    for migration in migrations {
        if applied.iter().any(|a| a.version == migration.version) {
            continue;
        }
        // DDL and bookkeeping row commit together or not at all.
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::sql_query(migration.up).execute(conn)?;
            diesel::sql_query(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            )
            .bind::<Text, _>(migration.version)
            .bind::<Text, _>(migration.name)
            .bind::<Text, _>(Utc::now().to_rfc3339())
            .execute(conn)?;
            Ok(())
        })
        .map_err(|e| {
            DatabaseError::Migration(format!("migration {} failed: {}", migration.version, e))
        })?;
        count += 1;
    }

    Ok(count)
}

#[cfg(feature = "postgres")]
pub fn run_postgres(
    conn: &mut diesel::pg::PgConnection,
    migrations: &[Migration],
) -> Result<usize, DatabaseError> {
    diesel::sql_query(
        "CREATE TABLE IF NOT EXISTS schema_migrations ( \
         version TEXT PRIMARY KEY, \
         name TEXT NOT NULL, \
         applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW() )",
    )
    .execute(conn)
    .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    let applied: Vec<AppliedVersion> =
        diesel::sql_query("SELECT version FROM schema_migrations ORDER BY version")
            .load(conn)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

    let mut count = 0;
    for migration in migrations {
        if applied.iter().any(|a| a.version == migration.version) {
            continue;
        }
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::sql_query(migration.up).execute(conn)?;
            diesel::sql_query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
                .bind::<Text, _>(migration.version)
                .bind::<Text, _>(migration.name)
                .execute(conn)?;
            Ok(())
        })
        .map_err(|e| {
            DatabaseError::Migration(format!("migration {} failed: {}", migration.version, e))
        })?;
        count += 1;
    }

    Ok(count)
}

#[cfg(feature = "mysql")]
pub fn run_mysql(
    conn: &mut diesel::mysql::MysqlConnection,
    migrations: &[Migration],
) -> Result<usize, DatabaseError> {
    diesel::sql_query(
        "CREATE TABLE IF NOT EXISTS schema_migrations ( \
         version VARCHAR(64) PRIMARY KEY, \
         name TEXT NOT NULL, \
         applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP )",
    )
    .execute(conn)
    .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    let applied: Vec<AppliedVersion> =
        diesel::sql_query("SELECT version FROM schema_migrations ORDER BY version")
            .load(conn)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

    let mut count = 0;
    for migration in migrations {
        if applied.iter().any(|a| a.version == migration.version) {
            continue;
        }
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::sql_query(migration.up).execute(conn)?;
            diesel::sql_query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
                .bind::<Text, _>(migration.version)
                .bind::<Text, _>(migration.name)
                .execute(conn)?;
            Ok(())
        })
        .map_err(|e| {
            DatabaseError::Migration(format!("migration {} failed: {}", migration.version, e))
        })?;
        count += 1;
    }

    Ok(count)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use tempfile::NamedTempFile;

    use super::{AppliedVersion, Migration, run_sqlite};

    fn temp_conn() -> (NamedTempFile, SqliteConnection) {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let conn = SqliteConnection::establish(&file.path().to_string_lossy())
            .expect("establish sqlite connection");
        (file, conn)
    }

    fn recorded_versions(conn: &mut SqliteConnection) -> Vec<String> {
        let rows: Vec<AppliedVersion> =
            diesel::sql_query("SELECT version FROM schema_migrations ORDER BY version")
                .load(conn)
                .expect("query schema_migrations");
        rows.into_iter().map(|r| r.version).collect()
    }

    #[test]
    fn empty_registry_provisions_bookkeeping_table() {
        let (_file, mut conn) = temp_conn();

        let applied = run_sqlite(&mut conn, &[]).expect("run migrations");
        assert_eq!(applied, 0);
        assert!(recorded_versions(&mut conn).is_empty());

        // Second run is a no-op against the existing table.
        let applied = run_sqlite(&mut conn, &[]).expect("run migrations again");
        assert_eq!(applied, 0);
    }

    #[test]
    fn pending_migration_applies_once_and_is_recorded() {
        let (_file, mut conn) = temp_conn();

        let registry = [Migration {
            version: "20260801000000",
            name: "create_notes",
            up: "CREATE TABLE notes ( id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL )",
        }];

        let applied = run_sqlite(&mut conn, &registry).expect("apply migration");
        assert_eq!(applied, 1);
        assert_eq!(recorded_versions(&mut conn), vec!["20260801000000"]);

        // The migrated table is usable.
        diesel::sql_query("INSERT INTO notes (body) VALUES ('hello')")
            .execute(&mut conn)
            .expect("insert into migrated table");

        let applied = run_sqlite(&mut conn, &registry).expect("re-run migration");
        assert_eq!(applied, 0);
        assert_eq!(recorded_versions(&mut conn), vec!["20260801000000"]);
    }
}

use sqlx::{Executor, PgConnection};

/// Schema and stored procedures, applied in order
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("001_patients.sql", include_str!("../../migrations/001_patients.sql")),
    ("002_procedures.sql", include_str!("../../migrations/002_procedures.sql")),
];

/// Run every migration not yet recorded in `schema_migrations`
pub async fn run_migrations(conn: &mut PgConnection) -> Result<usize, sqlx::Error> {
    init_migrations_tracker(conn).await?;

    let mut applied = 0;
    for (name, sql) in MIGRATIONS {
        if is_applied(conn, name).await? {
            tracing::debug!("Migration {} already applied", name);
            continue;
        }

        tracing::info!("Running migration: {}", name);
        // Plain string execution uses the simple query protocol, which allows
        // several statements per file
        (&mut *conn).execute(*sql).await?;
        record_migration(conn, name).await?;
        applied += 1;
    }

    tracing::info!("✓ Migrations complete ({} applied)", applied);
    Ok(applied)
}

/// Create the table tracking applied migrations
async fn init_migrations_tracker(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn is_applied(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar("SELECT id FROM schema_migrations WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Record a migration as applied
async fn record_migration(conn: &mut PgConnection, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_every_procedure_is_defined() {
        let procedures = MIGRATIONS[1].1;
        for name in [
            "GetAllPatients",
            "SearchPatients",
            "AddPatient",
            "UpdatePatient",
            "DeletePatient",
            "GetPatientStatistics",
        ] {
            assert!(
                procedures.contains(&format!("FUNCTION \"{}\"", name)),
                "missing procedure {}",
                name
            );
        }
    }
}

use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &mut Connection) -> anyhow::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let tx = conn.transaction()?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username VARCHAR NOT NULL UNIQUE,
            email VARCHAR NOT NULL UNIQUE,
            password_hash VARCHAR NOT NULL,
            role VARCHAR NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
            created_at BIGINT NOT NULL,
            deleted_at BIGINT
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS alumni (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            student_number VARCHAR NOT NULL UNIQUE,
            name VARCHAR NOT NULL,
            department VARCHAR NOT NULL,
            cohort_year INTEGER NOT NULL,
            graduation_year INTEGER NOT NULL,
            email VARCHAR NOT NULL UNIQUE,
            phone VARCHAR,
            address VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            deleted_at BIGINT,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        [],
    )?;

    // deleted_at and deleted_by are set and cleared together
    tx.execute(
        "CREATE TABLE IF NOT EXISTS employment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alumni_id INTEGER NOT NULL,
            company_name VARCHAR NOT NULL,
            job_title VARCHAR NOT NULL,
            industry VARCHAR NOT NULL DEFAULT '',
            work_location VARCHAR NOT NULL DEFAULT '',
            salary_range VARCHAR NOT NULL DEFAULT '',
            start_date DATE NOT NULL,
            end_date DATE,
            employment_status VARCHAR NOT NULL,
            description VARCHAR NOT NULL DEFAULT '',
            created_at BIGINT NOT NULL,
            updated_at BIGINT,
            deleted_by INTEGER,
            deleted_at BIGINT,
            CHECK ((deleted_at IS NULL) = (deleted_by IS NULL)),
            FOREIGN KEY (alumni_id) REFERENCES alumni (id)
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name VARCHAR NOT NULL UNIQUE,
            original_name VARCHAR NOT NULL,
            storage_path VARCHAR NOT NULL,
            size BIGINT NOT NULL,
            content_type VARCHAR NOT NULL,
            uploaded_by INTEGER NOT NULL,
            owner_id INTEGER NOT NULL,
            uploaded_at BIGINT NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_alumni_user ON alumni(user_id)",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_alumni_graduation_year ON alumni(graduation_year)",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_employment_alumni ON employment(alumni_id, deleted_at)",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner_id)",
        [],
    )?;

    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('users', 'alumni', 'employment', 'files')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_deleted_fields_move_together() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (username, email, password_hash, role, created_at)
                 VALUES ('u', 'u@example.com', 'x', 'user', 0);
             INSERT INTO alumni (user_id, student_number, name, department, cohort_year,
                                 graduation_year, email, created_at, updated_at)
                 VALUES (1, 'S1', 'A', 'CS', 2018, 2022, 'a@example.com', 0, 0);",
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO employment (alumni_id, company_name, job_title, start_date,
                                     employment_status, created_at, deleted_at)
             VALUES (1, 'Acme', 'Dev', '2023-01-01', 'Full-time', 0, 5)",
            [],
        );
        assert!(result.is_err());
    }
}

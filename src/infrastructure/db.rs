use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    // One SQLite connection: writers queue on it, and per-connection pragmas
    // and in-memory databases stay consistent.
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(db, "PRAGMA foreign_keys = ON").await?;

    // Create users table (members, employees and admins)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            address TEXT,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member'
                CHECK (role IN ('member', 'employee', 'admin')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Create documents table (one conceptual copy per document)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            year INTEGER,
            category TEXT NOT NULL,
            document_type TEXT NOT NULL,
            age_classification TEXT NOT NULL,
            description TEXT,
            isbn TEXT,
            image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category)",
    )
    .await?;

    // Create loans table
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            loan_date TEXT NOT NULL,
            expected_return_date TEXT NOT NULL,
            actual_return_date TEXT,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'returned')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((status = 'returned') = (actual_return_date IS NOT NULL)),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE RESTRICT,
            FOREIGN KEY (member_id) REFERENCES users(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    // Single copy: at most one active loan per document
    execute(
        db,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_loans_one_active ON loans(document_id) WHERE status = 'active'",
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_loans_member ON loans(member_id)",
    )
    .await?;

    // Create reservations table
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            reservation_date TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'fulfilled', 'cancelled')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE RESTRICT,
            FOREIGN KEY (member_id) REFERENCES users(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    // Single waitlist slot: at most one pending reservation per document
    execute(
        db,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reservations_one_pending ON reservations(document_id) WHERE status = 'pending'",
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_reservations_member ON reservations(member_id)",
    )
    .await?;

    Ok(())
}

use rentalhub_recovery::database::Database;
use std::path::PathBuf;
use uuid::Uuid;

pub struct TestDatabase {
    db: Database,
    path: PathBuf,
}

impl TestDatabase {
    pub fn db(&self) -> &Database {
        &self.db
    }
}

pub async fn setup_test_db() -> TestDatabase {
    // Use file-based SQLite for tests (unique UUID per test for parallel execution)
    let path = std::env::temp_dir().join(format!("test_{}.db", Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    TestDatabase { db, path }
}

pub async fn teardown_test_db(test_db: TestDatabase) {
    // Close the pool before removing the files
    test_db.db.pool().close().await;

    let base = test_db.path.display().to_string();
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", base, suffix));
    }
}

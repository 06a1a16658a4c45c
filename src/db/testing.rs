//! Fixtures shared by database and handler tests.

use crate::db::{
    Database, DependencyInput, DependencyType, Id, ServerInput, ServiceInput, SqliteDatabase,
};

pub async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Migration should succeed");
    db
}

pub fn server_input(name: &str) -> ServerInput {
    ServerInput {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn service_input(server_id: Id, name: &str) -> ServiceInput {
    ServiceInput {
        server_id,
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn dependency_input(
    service_id: Id,
    depends_on_id: Id,
    dependency_type: DependencyType,
) -> DependencyInput {
    DependencyInput {
        service_id,
        depends_on_id,
        label: None,
        dependency_type,
    }
}

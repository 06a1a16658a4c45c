//! Tests for SqliteDependencyRepository.

use crate::db::testing::{dependency_input, server_input, service_input, setup_db};
use crate::db::{
    Database, DbError, DependencyQuery, DependencyRepository, DependencyType, Id,
    ServerRepository, ServiceRepository, SqliteDatabase,
};

/// Server with three services: web, api, db.
async fn seed(db: &SqliteDatabase) -> (Id, Id, Id, Id) {
    let server = db.servers().create(&server_input("app")).await.unwrap();
    let web = db.services().create(&service_input(server.id, "web")).await.unwrap();
    let api = db.services().create(&service_input(server.id, "api")).await.unwrap();
    let store = db.services().create(&service_input(server.id, "db")).await.unwrap();
    (server.id, web.id, api.id, store.id)
}

#[tokio::test(flavor = "multi_thread")]
async fn create_and_get_dependency() {
    let db = setup_db().await;
    let (_, web, api, _) = seed(&db).await;

    let mut input = dependency_input(web, api, DependencyType::Optional);
    input.label = Some("REST".to_string());

    let created = db.dependencies().create(&input).await.unwrap();
    let retrieved = db.dependencies().get(created.id).await.unwrap();

    assert_eq!(retrieved.service_id, web);
    assert_eq!(retrieved.depends_on_id, api);
    assert_eq!(retrieved.label.as_deref(), Some("REST"));
    assert_eq!(retrieved.dependency_type, DependencyType::Optional);
}

#[tokio::test(flavor = "multi_thread")]
async fn self_dependency_is_rejected() {
    let db = setup_db().await;
    let (_, web, _, _) = seed(&db).await;

    let result = db
        .dependencies()
        .create(&dependency_input(web, web, DependencyType::Required))
        .await;
    assert!(matches!(result, Err(DbError::Validation { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_pair_already_exists() {
    let db = setup_db().await;
    let (_, web, api, _) = seed(&db).await;

    let input = dependency_input(web, api, DependencyType::Required);
    db.dependencies().create(&input).await.unwrap();

    let result = db.dependencies().create(&input).await;
    assert!(matches!(result, Err(DbError::AlreadyExists { .. })));

    // The reverse direction is a different edge
    db.dependencies()
        .create(&dependency_input(api, web, DependencyType::Fallback))
        .await
        .expect("Reverse edge should be allowed");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_service_violates_constraint() {
    let db = setup_db().await;
    let (_, web, _, _) = seed(&db).await;

    let result = db
        .dependencies()
        .create(&dependency_input(web, 999, DependencyType::Required))
        .await;
    assert!(matches!(result, Err(DbError::Constraint { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn dependencies_and_dependents_are_symmetric() {
    let db = setup_db().await;
    let (_, web, api, store) = seed(&db).await;

    db.dependencies()
        .create(&dependency_input(web, api, DependencyType::Required))
        .await
        .unwrap();
    db.dependencies()
        .create(&dependency_input(api, store, DependencyType::Required))
        .await
        .unwrap();

    let deps = db.dependencies().dependencies_of(api).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].service_id, store);
    assert_eq!(deps[0].name, "db");

    let dependents = db.dependencies().dependents_of(api).await.unwrap();
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].service_id, web);
    assert_eq!(dependents[0].name, "web");
    assert_eq!(dependents[0].dependency_id, deps[0].dependency_id - 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_changes_label_and_type_only() {
    let db = setup_db().await;
    let (_, web, api, store) = seed(&db).await;

    let created = db
        .dependencies()
        .create(&dependency_input(web, api, DependencyType::Required))
        .await
        .unwrap();

    let mut input = dependency_input(web, store, DependencyType::Fallback);
    input.label = Some("cache".to_string());
    let updated = db.dependencies().update(created.id, &input).await.unwrap();

    assert_eq!(updated.depends_on_id, api);
    assert_eq!(updated.dependency_type, DependencyType::Fallback);
    assert_eq!(updated.label.as_deref(), Some("cache"));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_either_end() {
    let db = setup_db().await;
    let (_, web, api, store) = seed(&db).await;

    db.dependencies()
        .create(&dependency_input(web, api, DependencyType::Required))
        .await
        .unwrap();
    db.dependencies()
        .create(&dependency_input(api, store, DependencyType::Optional))
        .await
        .unwrap();

    assert_eq!(db.dependencies().list(None).await.unwrap().total, 2);

    let query = DependencyQuery {
        service_id: Some(store),
        ..Default::default()
    };
    assert_eq!(db.dependencies().list(Some(&query)).await.unwrap().total, 1);

    let query = DependencyQuery {
        service_id: Some(api),
        ..Default::default()
    };
    assert_eq!(db.dependencies().list(Some(&query)).await.unwrap().total, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_service_removes_its_edges() {
    let db = setup_db().await;
    let (_, web, api, _) = seed(&db).await;

    db.dependencies()
        .create(&dependency_input(web, api, DependencyType::Required))
        .await
        .unwrap();

    db.services().delete(api).await.unwrap();
    assert_eq!(db.dependencies().list(None).await.unwrap().total, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_server_removes_edges_of_its_services() {
    let db = setup_db().await;
    let (server, web, _, _) = seed(&db).await;
    let other = db.servers().create(&server_input("other")).await.unwrap();
    let remote = db
        .services()
        .create(&service_input(other.id, "remote"))
        .await
        .unwrap();

    db.dependencies()
        .create(&dependency_input(remote.id, web, DependencyType::Required))
        .await
        .unwrap();

    db.servers().delete(server).await.unwrap();
    assert_eq!(db.dependencies().list(None).await.unwrap().total, 0);
    assert!(db.services().get(remote.id).await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_missing_dependency_returns_not_found() {
    let db = setup_db().await;

    let result = db.dependencies().delete(1).await;
    assert!(matches!(result, Err(DbError::NotFound { .. })));
}

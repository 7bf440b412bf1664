use super::*;
use serde_json::json;

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

fn task_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        other => panic!("expected object, got {other}"),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory_storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn inserts_and_lists_people_in_id_order() {
    let storage = memory_storage().await;
    let ann = storage
        .insert_person(&Person::new("Ann", 30, "a@x.com"))
        .await
        .expect("insert");
    let bo = storage
        .insert_person(&Person::new("Bo", 41, "b@x.com"))
        .await
        .expect("insert");

    assert!(ann.id.is_persisted());
    assert!(bo.id > ann.id);

    let people = storage.list_people().await.expect("list");
    assert_eq!(people, vec![ann, bo]);
}

#[tokio::test]
async fn insert_ignores_client_supplied_id() {
    let storage = memory_storage().await;
    let mut draft = Person::new("Ann", 30, "a@x.com");
    draft.id = EntityId(500);

    let stored = storage.insert_person(&draft).await.expect("insert");
    assert_eq!(stored.id, EntityId(1));
}

#[tokio::test]
async fn update_person_returns_none_for_missing_row() {
    let storage = memory_storage().await;
    let ann = storage
        .insert_person(&Person::new("Ann", 30, "a@x.com"))
        .await
        .expect("insert");

    let mut changed = ann.clone();
    changed.age = 31;
    let updated = storage
        .update_person(ann.id, &changed)
        .await
        .expect("update")
        .expect("row");
    assert_eq!(updated.age, 31);

    let missing = storage
        .update_person(EntityId(ann.id.0 + 1), &changed)
        .await
        .expect("update");
    assert!(missing.is_none());
}

#[tokio::test]
async fn deleted_ids_are_not_reused() {
    let storage = memory_storage().await;
    let ann = storage
        .insert_person(&Person::new("Ann", 30, "a@x.com"))
        .await
        .expect("insert");

    assert!(storage.delete_person(ann.id).await.expect("delete"));
    assert!(!storage.delete_person(ann.id).await.expect("delete again"));
    assert!(storage.get_person(ann.id).await.expect("get").is_none());

    let bo = storage
        .insert_person(&Person::new("Bo", 41, "b@x.com"))
        .await
        .expect("insert");
    assert_ne!(bo.id, ann.id);
}

#[tokio::test]
async fn tasks_round_trip_opaque_bodies() {
    let storage = memory_storage().await;
    let fields = task_fields(json!({
        "title": "write docs",
        "done": false,
        "labels": ["docs"],
    }));

    let task = storage.insert_task(&fields).await.expect("insert");
    assert_eq!(task.fields, fields);

    let replaced = storage
        .update_task(task.id, &task_fields(json!({ "title": "write docs", "done": true })))
        .await
        .expect("update")
        .expect("row");
    assert_eq!(replaced.field("done"), Some(&json!(true)));
    assert!(replaced.field("labels").is_none());

    let listed = storage.list_tasks().await.expect("list");
    assert_eq!(listed, vec![replaced]);
}

#[tokio::test]
async fn entity_store_dispatches_per_resource() {
    let storage = memory_storage().await;
    let person = EntityStore::<Person>::insert(&storage, &Person::new("Ann", 30, "a@x.com"))
        .await
        .expect("insert person");
    let task = EntityStore::<Task>::insert(
        &storage,
        &Task::with_fields(task_fields(json!({ "title": "t" }))),
    )
    .await
    .expect("insert task");

    assert_eq!(EntityStore::<Person>::list(&storage).await.expect("people").len(), 1);
    assert_eq!(EntityStore::<Task>::list(&storage).await.expect("tasks").len(), 1);
    assert!(EntityStore::<Person>::remove(&storage, person.id)
        .await
        .expect("remove"));
    assert_eq!(
        EntityStore::<Task>::fetch(&storage, task.id)
            .await
            .expect("fetch")
            .map(|task| task.id),
        Some(task.id)
    );
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .insert_person(&Person::new("Ann", 30, "a@x.com"))
        .await
        .expect("insert");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.list_people().await.expect("list").len(), 1);
}

#[test]
fn memory_urls_have_no_parent_dir() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://db"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/app.db?mode=rwc"),
        Some(PathBuf::from("./data/app.db"))
    );
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Entity, EntityId, Person, Task};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Persistence for one resource collection. Ids come from SQLite and are
/// never reused after a delete.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>>;
    async fn fetch(&self, id: EntityId) -> Result<Option<T>>;
    /// Any id on `entity` is ignored.
    async fn insert(&self, entity: &T) -> Result<T>;
    /// `None` when no row has `id`. The id on `entity` is ignored.
    async fn replace(&self, id: EntityId, entity: &T) -> Result<Option<T>>;
    async fn remove(&self, id: EntityId) -> Result<bool>;
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_people(&self) -> Result<Vec<Person>> {
        let rows = sqlx::query("SELECT id, name, age, email FROM people ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("failed to list people")?;
        rows.iter().map(person_from_row).collect()
    }

    pub async fn get_person(&self, id: EntityId) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT id, name, age, email FROM people WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load person {id}"))?;
        row.as_ref().map(person_from_row).transpose()
    }

    pub async fn insert_person(&self, person: &Person) -> Result<Person> {
        let row = sqlx::query(
            "INSERT INTO people (name, age, email) VALUES (?, ?, ?)
             RETURNING id, name, age, email",
        )
        .bind(&person.name)
        .bind(i64::from(person.age))
        .bind(&person.email)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert person")?;
        let stored = person_from_row(&row)?;
        debug!(id = %stored.id, "person inserted");
        Ok(stored)
    }

    pub async fn update_person(&self, id: EntityId, person: &Person) -> Result<Option<Person>> {
        let row = sqlx::query(
            "UPDATE people SET name = ?, age = ?, email = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?
             RETURNING id, name, age, email",
        )
        .bind(&person.name)
        .bind(i64::from(person.age))
        .bind(&person.email)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update person {id}"))?;
        row.as_ref().map(person_from_row).transpose()
    }

    pub async fn delete_person(&self, id: EntityId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM people WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete person {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query("SELECT id, body FROM tasks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("failed to list tasks")?;
        rows.iter().map(task_from_row).collect()
    }

    pub async fn get_task(&self, id: EntityId) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT id, body FROM tasks WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load task {id}"))?;
        row.as_ref().map(task_from_row).transpose()
    }

    pub async fn insert_task(&self, fields: &Map<String, Value>) -> Result<Task> {
        let body = serde_json::to_string(fields).context("failed to encode task body")?;
        let row = sqlx::query("INSERT INTO tasks (body) VALUES (?) RETURNING id, body")
            .bind(body)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert task")?;
        let stored = task_from_row(&row)?;
        debug!(id = %stored.id, "task inserted");
        Ok(stored)
    }

    pub async fn update_task(
        &self,
        id: EntityId,
        fields: &Map<String, Value>,
    ) -> Result<Option<Task>> {
        let body = serde_json::to_string(fields).context("failed to encode task body")?;
        let row = sqlx::query(
            "UPDATE tasks SET body = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?
             RETURNING id, body",
        )
        .bind(body)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update task {id}"))?;
        row.as_ref().map(task_from_row).transpose()
    }

    pub async fn delete_task(&self, id: EntityId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete task {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EntityStore<Person> for Storage {
    async fn list(&self) -> Result<Vec<Person>> {
        self.list_people().await
    }

    async fn fetch(&self, id: EntityId) -> Result<Option<Person>> {
        self.get_person(id).await
    }

    async fn insert(&self, entity: &Person) -> Result<Person> {
        self.insert_person(entity).await
    }

    async fn replace(&self, id: EntityId, entity: &Person) -> Result<Option<Person>> {
        self.update_person(id, entity).await
    }

    async fn remove(&self, id: EntityId) -> Result<bool> {
        self.delete_person(id).await
    }
}

#[async_trait]
impl EntityStore<Task> for Storage {
    async fn list(&self) -> Result<Vec<Task>> {
        self.list_tasks().await
    }

    async fn fetch(&self, id: EntityId) -> Result<Option<Task>> {
        self.get_task(id).await
    }

    async fn insert(&self, entity: &Task) -> Result<Task> {
        self.insert_task(&entity.fields).await
    }

    async fn replace(&self, id: EntityId, entity: &Task) -> Result<Option<Task>> {
        self.update_task(id, &entity.fields).await
    }

    async fn remove(&self, id: EntityId) -> Result<bool> {
        self.delete_task(id).await
    }
}

fn person_from_row(row: &SqliteRow) -> Result<Person> {
    let id: i64 = row.try_get("id")?;
    let age: i64 = row.try_get("age")?;
    Ok(Person {
        id: EntityId(id),
        name: row.try_get("name")?,
        age: u32::try_from(age).with_context(|| format!("person {id} has invalid age {age}"))?,
        email: row.try_get("email")?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: i64 = row.try_get("id")?;
    let body: String = row.try_get("body")?;
    let mut fields: Map<String, Value> = serde_json::from_str(&body)
        .with_context(|| format!("task {id} has a corrupt body"))?;
    fields.remove("id");
    Ok(Task {
        id: EntityId(id),
        fields,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    match sqlite_path(database_url).as_deref().and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {} for {database_url}", dir.display())),
        _ => Ok(()),
    }
}

/// File path behind an sqlx SQLite URL; `None` for in-memory and non-SQLite URLs.
fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url.strip_prefix("sqlite:")?;
    if rest.starts_with(":memory:") {
        return None;
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().filter(|path| !path.is_empty())?;
    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

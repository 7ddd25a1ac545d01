/// Item repository
use crate::db::models::Item;
use crate::error::ApiResult;
use crate::repo::{constraint_error, Repository};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

/// Input model for creating an item; the owner reference is required
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ItemCreate {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

/// Input model for updating an item; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ItemUpdate {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Item repository
pub struct ItemRepository {
    db: SqlitePool,
}

const ITEM_COLUMNS: &str = "id, title, description, owner_id, created_at, updated_at";

impl ItemRepository {
    /// Create a new item repository
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List the items owned by a user, paginated
    pub async fn list_by_owner(
        &self,
        owner_id: i64,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM item WHERE owner_id = ?1 LIMIT ?2 OFFSET ?3",
            ITEM_COLUMNS
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl Repository for ItemRepository {
    type Entity = Item;
    type Create = ItemCreate;
    type Update = ItemUpdate;

    async fn get(&self, id: i64) -> ApiResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM item WHERE id = ?1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    async fn list(&self, skip: i64, limit: i64) -> ApiResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM item LIMIT ?1 OFFSET ?2",
            ITEM_COLUMNS
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn create(&self, input: ItemCreate) -> ApiResult<Item> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO item (title, description, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.owner_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| constraint_error(e, "item"))?;

        Ok(Item {
            id: result.last_insert_rowid(),
            title: input.title,
            description: input.description,
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, existing: Item, input: ItemUpdate) -> ApiResult<Item> {
        let mut item = existing;

        if let Some(title) = input.title {
            item.title = title;
        }
        if let Some(description) = input.description {
            item.description = Some(description);
        }
        item.updated_at = Utc::now();

        sqlx::query(
            "UPDATE item SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.updated_at)
        .bind(item.id)
        .execute(&self.db)
        .await
        .map_err(|e| constraint_error(e, "item"))?;

        Ok(item)
    }

    async fn remove(&self, id: i64) -> ApiResult<Option<Item>> {
        let mut tx = self.db.begin().await?;

        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM item WHERE id = ?1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(item) = item else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM item WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(item))
    }
}

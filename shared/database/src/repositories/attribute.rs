//! Attribute Repository
//!
//! Attribute definitions and their ordered values.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, AttributeValue};

use super::{database_error, map_sqlx_error};
use crate::store::StoreResult;

pub struct AttributeRepository {
    pool: PgPool,
}

impl AttributeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all attributes with their values in position order
    pub async fn find_all(&self) -> StoreResult<Vec<AttributeDefinition>> {
        let attributes: Vec<AttributeRow> = sqlx::query_as("SELECT id, name FROM attributes ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        let values: Vec<AttributeValueRow> = sqlx::query_as(
            r#"
            SELECT id, attribute_id, value
            FROM attribute_values
            ORDER BY attribute_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(attributes
            .into_iter()
            .map(|row| AttributeDefinition {
                id: row.id,
                values: values
                    .iter()
                    .filter(|v| v.attribute_id == row.id)
                    .map(|v| AttributeValue {
                        id: v.id,
                        attribute_id: v.attribute_id,
                        value: v.value.clone(),
                    })
                    .collect(),
                name: row.name,
            })
            .collect())
    }

    /// Create an attribute together with its values
    pub async fn create(&self, attribute: AttributeDefinition) -> StoreResult<AttributeDefinition> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query("INSERT INTO attributes (id, name) VALUES ($1, $2)")
            .bind(attribute.id)
            .bind(&attribute.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "attribute", &attribute.name))?;

        for (position, value) in attribute.values.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO attribute_values (id, attribute_id, value, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(value.id)
            .bind(attribute.id)
            .bind(&value.value)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;
        Ok(attribute)
    }
}

#[derive(Debug, FromRow)]
struct AttributeRow {
    id: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct AttributeValueRow {
    id: Uuid,
    attribute_id: Uuid,
    value: String,
}

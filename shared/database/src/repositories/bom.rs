//! BOM Repository
//!
//! BOM documents are stored across three tables (`boms`, `bom_lines`,
//! `bom_operations`) and written in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use bomforge_models::{BomDocument, BomDocumentLine, BomSummary, NewBom, OperationAssignment, QuantityMode};

use super::{database_error, map_sqlx_error};
use crate::store::{variant_key, StoreResult, BOM_ENTITY};

pub struct BomRepository {
    pool: PgPool,
}

impl BomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lightweight listing used for code probing
    pub async fn summaries(&self) -> StoreResult<Vec<BomSummary>> {
        let rows: Vec<BomSummaryRow> = sqlx::query_as(
            "SELECT id, code, item_id, variant_value_ids FROM boms WHERE active ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows
            .into_iter()
            .map(|r| BomSummary {
                id: r.id,
                code: r.code,
                item_id: r.item_id,
                variant_value_ids: r.variant_value_ids,
            })
            .collect())
    }

    /// Find all active BOM documents with lines and operations
    pub async fn find_all(&self) -> StoreResult<Vec<BomDocument>> {
        let headers: Vec<BomRow> = sqlx::query_as(
            r#"
            SELECT id, code, description, item_id, variant_value_ids, quantity,
                   tolerance_percentage, active, created_at
            FROM boms
            WHERE active
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let lines: Vec<BomLineRow> = sqlx::query_as(
            r#"
            SELECT bom_id, item_id, variant_value_ids, quantity, is_percentage, source_location_id
            FROM bom_lines
            ORDER BY bom_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let operations: Vec<BomOperationRow> = sqlx::query_as(
            r#"
            SELECT bom_id, operation_id, work_center_id, sequence, time_minutes
            FROM bom_operations
            ORDER BY bom_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(headers
            .into_iter()
            .map(|header| assemble(header, &lines, &operations))
            .collect())
    }

    /// Find BOM by ID
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<BomDocument>> {
        let header: Option<BomRow> = sqlx::query_as(
            r#"
            SELECT id, code, description, item_id, variant_value_ids, quantity,
                   tolerance_percentage, active, created_at
            FROM boms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines: Vec<BomLineRow> = sqlx::query_as(
            r#"
            SELECT bom_id, item_id, variant_value_ids, quantity, is_percentage, source_location_id
            FROM bom_lines
            WHERE bom_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let operations: Vec<BomOperationRow> = sqlx::query_as(
            r#"
            SELECT bom_id, operation_id, work_center_id, sequence, time_minutes
            FROM bom_operations
            WHERE bom_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(Some(assemble(header, &lines, &operations)))
    }

    /// Create a BOM document; header, lines and operations commit together
    pub async fn create(&self, bom: NewBom) -> StoreResult<BomDocument> {
        let code = bom.code.clone();
        let document = bom.into_document();
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query(
            r#"
            INSERT INTO boms
                (id, code, description, item_id, variant_value_ids, variant_key,
                 quantity, tolerance_percentage, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(document.id)
        .bind(&document.code)
        .bind(&document.description)
        .bind(document.item_id)
        .bind(&document.variant_value_ids)
        .bind(variant_key(&document.variant_value_ids))
        .bind(document.quantity)
        .bind(document.tolerance_percentage)
        .bind(document.active)
        .bind(document.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(e, BOM_ENTITY, &code))?;

        for (position, line) in document.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bom_lines
                    (bom_id, position, item_id, variant_value_ids, quantity,
                     is_percentage, source_location_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(document.id)
            .bind(position as i32)
            .bind(line.item_id)
            .bind(&line.variant_value_ids)
            .bind(line.quantity)
            .bind(line.mode.is_percentage())
            .bind(line.source_location_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, BOM_ENTITY, &code))?;
        }

        for (position, op) in document.operations.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bom_operations
                    (bom_id, position, operation_id, work_center_id, sequence, time_minutes)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(document.id)
            .bind(position as i32)
            .bind(op.operation_id)
            .bind(op.work_center_id)
            .bind(op.sequence)
            .bind(op.time_minutes)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, BOM_ENTITY, &code))?;
        }

        tx.commit().await.map_err(database_error)?;
        Ok(document)
    }
}

fn assemble(header: BomRow, lines: &[BomLineRow], operations: &[BomOperationRow]) -> BomDocument {
    BomDocument {
        id: header.id,
        code: header.code,
        description: header.description,
        item_id: header.item_id,
        variant_value_ids: header.variant_value_ids,
        quantity: header.quantity,
        tolerance_percentage: header.tolerance_percentage,
        operations: operations
            .iter()
            .filter(|op| op.bom_id == header.id)
            .map(|op| OperationAssignment {
                operation_id: op.operation_id,
                work_center_id: op.work_center_id,
                sequence: op.sequence,
                time_minutes: op.time_minutes,
            })
            .collect(),
        lines: lines
            .iter()
            .filter(|line| line.bom_id == header.id)
            .map(|line| BomDocumentLine {
                item_id: line.item_id,
                variant_value_ids: line.variant_value_ids.clone(),
                quantity: line.quantity,
                mode: QuantityMode::from_flag(line.is_percentage),
                source_location_id: line.source_location_id,
            })
            .collect(),
        active: header.active,
        created_at: header.created_at,
    }
}

#[derive(Debug, FromRow)]
struct BomSummaryRow {
    id: Uuid,
    code: String,
    item_id: Uuid,
    variant_value_ids: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct BomRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    item_id: Uuid,
    variant_value_ids: Vec<Uuid>,
    quantity: Decimal,
    tolerance_percentage: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BomLineRow {
    bom_id: Uuid,
    item_id: Uuid,
    variant_value_ids: Vec<Uuid>,
    quantity: Decimal,
    is_percentage: bool,
    source_location_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct BomOperationRow {
    bom_id: Uuid,
    operation_id: Uuid,
    work_center_id: Option<Uuid>,
    sequence: i32,
    time_minutes: Decimal,
}

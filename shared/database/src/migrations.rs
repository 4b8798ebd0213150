use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    // Create attributes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attributes (
            id UUID PRIMARY KEY,
            name VARCHAR(64) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create attribute_values table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attribute_values (
            id UUID PRIMARY KEY,
            attribute_id UUID NOT NULL REFERENCES attributes(id),
            value VARCHAR(128) NOT NULL,
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create items table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id UUID PRIMARY KEY,
            code VARCHAR(64) NOT NULL,
            name VARCHAR(255) NOT NULL,
            uom VARCHAR(32) NOT NULL,
            category VARCHAR(64),
            attribute_ids UUID[] NOT NULL DEFAULT '{}',
            source_sample_id UUID REFERENCES items(id),
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT items_code_key UNIQUE (code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create boms table; variant_key is the sorted, comma-joined value id set
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS boms (
            id UUID PRIMARY KEY,
            code VARCHAR(64) NOT NULL,
            description TEXT,
            item_id UUID NOT NULL REFERENCES items(id),
            variant_value_ids UUID[] NOT NULL DEFAULT '{}',
            variant_key TEXT NOT NULL,
            quantity NUMERIC NOT NULL CHECK (quantity > 0),
            tolerance_percentage NUMERIC NOT NULL DEFAULT 0 CHECK (tolerance_percentage >= 0),
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT boms_code_key UNIQUE (code),
            CONSTRAINT boms_item_variant_key UNIQUE (item_id, variant_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bom_lines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bom_lines (
            bom_id UUID NOT NULL REFERENCES boms(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            item_id UUID NOT NULL REFERENCES items(id),
            variant_value_ids UUID[] NOT NULL DEFAULT '{}',
            quantity NUMERIC NOT NULL CHECK (quantity > 0),
            is_percentage BOOLEAN NOT NULL DEFAULT FALSE,
            source_location_id UUID,
            PRIMARY KEY (bom_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bom_operations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bom_operations (
            bom_id UUID NOT NULL REFERENCES boms(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            operation_id UUID NOT NULL,
            work_center_id UUID,
            sequence INTEGER NOT NULL DEFAULT 10,
            time_minutes NUMERIC NOT NULL DEFAULT 0,
            PRIMARY KEY (bom_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attribute_values_attribute_id ON attribute_values(attribute_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_boms_item_id ON boms(item_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bom_lines_item_id ON bom_lines(item_id)")
        .execute(pool)
        .await?;

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes if they do not exist. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Contacts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_system TEXT NOT NULL,
            source_unique_id TEXT NOT NULL DEFAULT '',
            phone_raw TEXT NOT NULL DEFAULT '',
            normalized_phone TEXT NOT NULL DEFAULT '',
            phone_national TEXT NOT NULL DEFAULT '',
            phone_international TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            name_full TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            middle_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            name_suffix TEXT NOT NULL DEFAULT '',
            lead_score INTEGER NOT NULL DEFAULT 0,
            qualification_status TEXT NOT NULL DEFAULT 'new',
            utm_source TEXT NOT NULL DEFAULT '',
            utm_medium TEXT NOT NULL DEFAULT '',
            utm_campaign TEXT NOT NULL DEFAULT '',
            utm_content TEXT NOT NULL DEFAULT '',
            utm_term TEXT NOT NULL DEFAULT '',
            device_type TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Interactions, immutable once written
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL,
            interaction_type TEXT NOT NULL,
            interaction_data TEXT NOT NULL DEFAULT '{}',
            score_contribution INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (lead_id) REFERENCES leads(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only score audit trail
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scoring_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL,
            old_score INTEGER NOT NULL,
            new_score INTEGER NOT NULL,
            reason TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (lead_id) REFERENCES leads(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_normalized_phone ON leads(normalized_phone)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_lead_id ON interactions(lead_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scoring_history_lead_id ON scoring_history(lead_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

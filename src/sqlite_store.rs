//! SQLite-backed [`LeadStore`] implementation.
//!
//! Timestamps are stored as Unix seconds. The interaction write, the score
//! update, and the audit row share one transaction; the new score comes from
//! the `UPDATE ... RETURNING` that writes it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use lead_intake_core::models::{
    Interaction, InteractionRecord, InteractionType, Lead, NewLead, PersonName, PhoneNumber,
    ReportRow, ScoringHistoryEntry, TrackedInteraction, Utm,
};
use lead_intake_core::store::LeadStore;

/// SQLite implementation of the [`LeadStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn from_ts(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn lead_from_row(row: &SqliteRow) -> Lead {
    Lead {
        id: row.get("id"),
        source_system: row.get("source_system"),
        source_unique_id: row.get("source_unique_id"),
        phone: PhoneNumber {
            raw: row.get("phone_raw"),
            normalized: row.get("normalized_phone"),
            national: row.get("phone_national"),
            international: row.get("phone_international"),
        },
        email: row.get("email"),
        name: PersonName {
            full: row.get("name_full"),
            first: row.get("first_name"),
            middle: row.get("middle_name"),
            last: row.get("last_name"),
            suffix: row.get("name_suffix"),
        },
        lead_score: row.get("lead_score"),
        qualification_status: row.get("qualification_status"),
        utm: Utm {
            source: row.get("utm_source"),
            medium: row.get("utm_medium"),
            campaign: row.get("utm_campaign"),
            content: row.get("utm_content"),
            term: row.get("utm_term"),
        },
        device_type: row.get("device_type"),
        created_at: from_ts(row.get("created_at")),
        updated_at: from_ts(row.get("updated_at")),
    }
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn find_contacts(&self, phone: Option<&str>, email: Option<&str>) -> Result<Vec<i64>> {
        if phone.is_none() && email.is_none() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM leads
            WHERE (? IS NOT NULL AND normalized_phone = ?)
               OR (? IS NOT NULL AND email = ?)
            ORDER BY id ASC
            "#,
        )
        .bind(phone)
        .bind(phone)
        .bind(email)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn create_lead(&self, lead: &NewLead) -> Result<i64> {
        let ts = lead.created_at.timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO leads (source_system, source_unique_id,
                               phone_raw, normalized_phone, phone_national, phone_international,
                               email, name_full, first_name, middle_name, last_name, name_suffix,
                               utm_source, utm_medium, utm_campaign, utm_content, utm_term,
                               device_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.source_system)
        .bind(&lead.source_unique_id)
        .bind(&lead.phone.raw)
        .bind(&lead.phone.normalized)
        .bind(&lead.phone.national)
        .bind(&lead.phone.international)
        .bind(&lead.email)
        .bind(&lead.name.full)
        .bind(&lead.name.first)
        .bind(&lead.name.middle)
        .bind(&lead.name.last)
        .bind(&lead.name.suffix)
        .bind(&lead.utm.source)
        .bind(&lead.utm.medium)
        .bind(&lead.utm.campaign)
        .bind(&lead.utm.content)
        .bind(&lead.utm.term)
        .bind(&lead.device_type)
        .bind(ts)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn fill_empty_fields(&self, id: i64, lead: &NewLead) -> Result<()> {
        // Phone and name columns move as a group, keyed on their primary column.
        sqlx::query(
            r#"
            UPDATE leads SET
                phone_raw = CASE WHEN normalized_phone = '' THEN ? ELSE phone_raw END,
                phone_national = CASE WHEN normalized_phone = '' THEN ? ELSE phone_national END,
                phone_international = CASE WHEN normalized_phone = '' THEN ? ELSE phone_international END,
                normalized_phone = COALESCE(NULLIF(normalized_phone, ''), ?),
                first_name = CASE WHEN name_full = '' THEN ? ELSE first_name END,
                middle_name = CASE WHEN name_full = '' THEN ? ELSE middle_name END,
                last_name = CASE WHEN name_full = '' THEN ? ELSE last_name END,
                name_suffix = CASE WHEN name_full = '' THEN ? ELSE name_suffix END,
                name_full = COALESCE(NULLIF(name_full, ''), ?),
                email = COALESCE(NULLIF(email, ''), ?),
                source_unique_id = COALESCE(NULLIF(source_unique_id, ''), ?),
                utm_source = COALESCE(NULLIF(utm_source, ''), ?),
                utm_medium = COALESCE(NULLIF(utm_medium, ''), ?),
                utm_campaign = COALESCE(NULLIF(utm_campaign, ''), ?),
                utm_content = COALESCE(NULLIF(utm_content, ''), ?),
                utm_term = COALESCE(NULLIF(utm_term, ''), ?),
                device_type = COALESCE(NULLIF(device_type, ''), ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&lead.phone.raw)
        .bind(&lead.phone.national)
        .bind(&lead.phone.international)
        .bind(&lead.phone.normalized)
        .bind(&lead.name.first)
        .bind(&lead.name.middle)
        .bind(&lead.name.last)
        .bind(&lead.name.suffix)
        .bind(&lead.name.full)
        .bind(&lead.email)
        .bind(&lead.source_unique_id)
        .bind(&lead.utm.source)
        .bind(&lead.utm.medium)
        .bind(&lead.utm.campaign)
        .bind(&lead.utm.content)
        .bind(&lead.utm.term)
        .bind(&lead.device_type)
        .bind(lead.created_at.timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(lead_from_row))
    }

    async fn record_interaction(
        &self,
        record: &InteractionRecord,
    ) -> Result<Option<TrackedInteraction>> {
        let ts = record.recorded_at.timestamp();
        let mut tx = self.pool.begin().await?;

        let new_score: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE leads SET
                lead_score = lead_score + ?,
                qualification_status = COALESCE(?, qualification_status),
                updated_at = ?
            WHERE id = ?
            RETURNING lead_score
            "#,
        )
        .bind(record.score_contribution)
        .bind(&record.qualification_status)
        .bind(ts)
        .bind(record.lead_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_score) = new_score else {
            tx.rollback().await?;
            return Ok(None);
        };
        let previous_score = new_score - record.score_contribution;

        let interaction_id = sqlx::query(
            r#"
            INSERT INTO interactions (lead_id, interaction_type, interaction_data,
                                      score_contribution, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.lead_id)
        .bind(record.interaction_type.as_str())
        .bind(serde_json::to_string(&record.payload)?)
        .bind(record.score_contribution)
        .bind(ts)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO scoring_history (lead_id, old_score, new_score, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.lead_id)
        .bind(previous_score)
        .bind(new_score)
        .bind(&record.reason)
        .bind(ts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(TrackedInteraction {
            interaction_id,
            score_contribution: record.score_contribution,
            previous_score,
            new_total_score: new_score,
            interaction_tracked: true,
        }))
    }

    async fn interactions(&self, lead_id: i64) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, lead_id, interaction_type, interaction_data, score_contribution, created_at
            FROM interactions WHERE lead_id = ? ORDER BY id ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let data: String = row.get("interaction_data");
                let kind: String = row.get("interaction_type");
                Interaction {
                    id: row.get("id"),
                    lead_id: row.get("lead_id"),
                    interaction_type: InteractionType::parse_lenient(&kind),
                    payload: serde_json::from_str(&data)
                        .unwrap_or(serde_json::Value::String(data)),
                    score_contribution: row.get("score_contribution"),
                    created_at: from_ts(row.get("created_at")),
                }
            })
            .collect())
    }

    async fn scoring_history(&self, lead_id: i64) -> Result<Vec<ScoringHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, lead_id, old_score, new_score, reason, created_at
            FROM scoring_history WHERE lead_id = ? ORDER BY id ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ScoringHistoryEntry {
                id: row.get("id"),
                lead_id: row.get("lead_id"),
                old_score: row.get("old_score"),
                new_score: row.get("new_score"),
                reason: row.get("reason"),
                created_at: from_ts(row.get("created_at")),
            })
            .collect())
    }

    async fn report_rows(
        &self,
        since: DateTime<Utc>,
        source_filter: Option<&str>,
        score_threshold: i64,
    ) -> Result<Vec<ReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT source_system,
                   qualification_status,
                   COUNT(*) AS total_leads,
                   AVG(lead_score) AS avg_score,
                   SUM(CASE WHEN lead_score >= ? THEN 1 ELSE 0 END) AS qualified_leads
            FROM leads
            WHERE created_at >= ?
              AND (? IS NULL OR source_system = ?)
            GROUP BY source_system, qualification_status
            ORDER BY source_system, qualification_status
            "#,
        )
        .bind(score_threshold)
        .bind(since.timestamp())
        .bind(source_filter)
        .bind(source_filter)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ReportRow {
                source_system: row.get("source_system"),
                qualification_status: row.get("qualification_status"),
                total_leads: row.get("total_leads"),
                avg_score: row.get("avg_score"),
                qualified_leads: row.get("qualified_leads"),
            })
            .collect())
    }
}

use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{JobPosting, JobSection, JobSectionKind};

pub struct JobRepository;

const JOB_COLUMNS: &str =
    "id, owner_id, title, company, description, status, post_url, created_at, updated_at";

impl JobRepository {
    /// Insert the posting and its sections in one transaction.
    pub async fn create(conn: &Connection, job: &JobPosting, sections: &[JobSection]) -> Result<()> {
        let tx = conn.transaction().await?;

        match Self::write_rows(&tx, job, sections).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(job_id = %job.id, error = %rollback_err, "Job rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_rows(conn: &Connection, job: &JobPosting, sections: &[JobSection]) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO job_postings (
                id, owner_id, title, company, description, status, post_url, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                job.id.clone(),
                job.owner_id.clone(),
                job.title.clone(),
                job.company.clone(),
                job.description.clone(),
                job.status.clone(),
                job.post_url.clone(),
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        for (position, section) in sections.iter().enumerate() {
            conn.execute(
                r#"
                INSERT INTO job_posting_sections (job_id, owner_id, section, content, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    job.id.clone(),
                    job.owner_id.clone(),
                    section.kind.key(),
                    section.content.clone(),
                    position as i64,
                ],
            )
            .await?;
        }

        Ok(())
    }

    pub async fn get(conn: &Connection, owner_id: &str, job_id: &str) -> Result<Option<JobPosting>> {
        let mut rows = conn
            .query(
                &format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE id = ?1 AND owner_id = ?2"),
                params![job_id, owner_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(conn: &Connection, owner_id: &str) -> Result<Vec<JobPosting>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM job_postings WHERE owner_id = ?1 ORDER BY created_at ASC, rowid ASC"
                ),
                params![owner_id],
            )
            .await?;

        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(Self::row_to_job(&row)?);
        }
        Ok(jobs)
    }

    pub async fn sections(conn: &Connection, job_id: &str) -> Result<Vec<JobSection>> {
        let mut rows = conn
            .query(
                r#"
                SELECT section, content
                FROM job_posting_sections
                WHERE job_id = ?1
                ORDER BY position ASC
                "#,
                params![job_id],
            )
            .await?;

        let mut sections = Vec::new();
        while let Some(row) = rows.next().await? {
            let key: String = row.get(0)?;
            match JobSectionKind::from_key(&key) {
                Some(kind) => sections.push(JobSection {
                    kind,
                    content: row.get(1)?,
                }),
                None => tracing::warn!(job_id, section = %key, "Skipping unknown job section"),
            }
        }
        Ok(sections)
    }

    pub async fn delete(conn: &Connection, owner_id: &str, job_id: &str) -> Result<bool> {
        conn.execute(
            "DELETE FROM job_posting_sections WHERE job_id = ?1 AND owner_id = ?2",
            params![job_id, owner_id],
        )
        .await?;

        let affected = conn
            .execute(
                "DELETE FROM job_postings WHERE id = ?1 AND owner_id = ?2",
                params![job_id, owner_id],
            )
            .await?;

        Ok(affected > 0)
    }

    fn row_to_job(row: &libsql::Row) -> Result<JobPosting> {
        Ok(JobPosting {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            company: row.get(3)?,
            description: row.get(4)?,
            status: row.get(5)?,
            post_url: row.get(6)?,
            created_at: parse_timestamp(&row.get::<String>(7)?),
            updated_at: parse_timestamp(&row.get::<String>(8)?),
        })
    }
}

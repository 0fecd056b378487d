use chrono::Utc;
use libsql::{params, Connection};
use nanoid::nanoid;

use crate::error::Result;
use crate::models::{Section, StoredResume, FULL_RESUME_SECTION};

pub struct ResumeRepository;

impl ResumeRepository {
    /// Replace the owner's canonical résumé in one transaction: the
    /// `FULL RESUME` row first, then one row per section in document order.
    pub async fn replace(
        conn: &Connection,
        owner_id: &str,
        full_text: &str,
        sections: &[Section],
    ) -> Result<()> {
        let tx = conn.transaction().await?;

        match Self::write_rows(&tx, owner_id, full_text, sections).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(owner_id, error = %rollback_err, "Résumé rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_rows(
        conn: &Connection,
        owner_id: &str,
        full_text: &str,
        sections: &[Section],
    ) -> Result<()> {
        conn.execute("DELETE FROM resumes WHERE owner_id = ?1", params![owner_id])
            .await?;

        let now = Utc::now().to_rfc3339();
        let rows = std::iter::once((FULL_RESUME_SECTION, full_text)).chain(
            sections
                .iter()
                .map(|s| (s.header.as_str(), s.body.as_str())),
        );

        for (position, (header, body)) in rows.enumerate() {
            conn.execute(
                r#"
                INSERT INTO resumes (id, owner_id, section_header, section_body, position, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![nanoid!(), owner_id, header, body, position as i64, now.clone()],
            )
            .await?;
        }

        Ok(())
    }

    pub async fn get(conn: &Connection, owner_id: &str) -> Result<Option<StoredResume>> {
        let mut rows = conn
            .query(
                r#"
                SELECT section_header, section_body
                FROM resumes
                WHERE owner_id = ?1
                ORDER BY position ASC
                "#,
                params![owner_id],
            )
            .await?;

        let mut resume = StoredResume {
            owner_id: owner_id.to_string(),
            ..Default::default()
        };
        let mut found = false;

        while let Some(row) = rows.next().await? {
            found = true;
            let header: String = row.get(0)?;
            let body: String = row.get(1)?;
            if header == FULL_RESUME_SECTION && resume.full_text.is_none() {
                resume.full_text = Some(body);
            } else {
                resume.sections.push(Section::new(header, body));
            }
        }

        Ok(found.then_some(resume))
    }

    /// Owners with any canonical content.
    pub async fn list_owners(conn: &Connection) -> Result<Vec<String>> {
        let mut rows = conn
            .query(
                r#"
                SELECT owner_id FROM resumes
                UNION SELECT owner_id FROM job_postings
                UNION SELECT owner_id FROM interview_questions
                ORDER BY owner_id
                "#,
                (),
            )
            .await?;

        let mut owners = Vec::new();
        while let Some(row) = rows.next().await? {
            owners.push(row.get::<String>(0)?);
        }
        Ok(owners)
    }
}

use chrono::Utc;
use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::InterviewQuestion;

pub struct QuestionRepository;

const QUESTION_COLUMNS: &str =
    "id, owner_id, job_id, question, answer, recommendation, created_at, updated_at";

impl QuestionRepository {
    pub async fn create_batch(conn: &Connection, questions: &[InterviewQuestion]) -> Result<()> {
        let tx = conn.transaction().await?;

        for q in questions {
            let inserted = tx
                .execute(
                    r#"
                    INSERT INTO interview_questions (
                        id, owner_id, job_id, question, answer, recommendation, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        q.id.clone(),
                        q.owner_id.clone(),
                        q.job_id.clone(),
                        q.question.clone(),
                        q.answer.clone(),
                        q.recommendation.clone(),
                        q.created_at.to_rfc3339(),
                        q.updated_at.to_rfc3339(),
                    ],
                )
                .await;

            if let Err(e) = inserted {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Question batch rollback failed");
                }
                return Err(e.into());
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get(
        conn: &Connection,
        owner_id: &str,
        question_id: &str,
    ) -> Result<Option<InterviewQuestion>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {QUESTION_COLUMNS} FROM interview_questions WHERE id = ?1 AND owner_id = ?2"
                ),
                params![question_id, owner_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_question(&row)?)),
            None => Ok(None),
        }
    }

    /// Questions for one owner and job; `None` selects questions not tied
    /// to any job.
    pub async fn list_for_job(
        conn: &Connection,
        owner_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<InterviewQuestion>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {QUESTION_COLUMNS} FROM interview_questions
                     WHERE owner_id = ?1 AND job_id IS ?2
                     ORDER BY created_at ASC, rowid ASC"
                ),
                params![owner_id, job_id],
            )
            .await?;

        Self::collect(&mut rows).await
    }

    pub async fn list_answered(conn: &Connection, owner_id: &str) -> Result<Vec<InterviewQuestion>> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {QUESTION_COLUMNS} FROM interview_questions
                     WHERE owner_id = ?1 AND answer IS NOT NULL AND trim(answer) != ''
                     ORDER BY created_at ASC, rowid ASC"
                ),
                params![owner_id],
            )
            .await?;

        Self::collect(&mut rows).await
    }

    pub async fn update_answer(
        conn: &Connection,
        owner_id: &str,
        question_id: &str,
        answer: Option<&str>,
    ) -> Result<bool> {
        let affected = conn
            .execute(
                "UPDATE interview_questions SET answer = ?3, updated_at = ?4 WHERE id = ?1 AND owner_id = ?2",
                params![question_id, owner_id, answer, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn set_recommendation(
        conn: &Connection,
        owner_id: &str,
        question_id: &str,
        recommendation: &str,
    ) -> Result<bool> {
        let affected = conn
            .execute(
                "UPDATE interview_questions SET recommendation = ?3, updated_at = ?4 WHERE id = ?1 AND owner_id = ?2",
                params![question_id, owner_id, recommendation, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn delete(conn: &Connection, owner_id: &str, question_id: &str) -> Result<bool> {
        let affected = conn
            .execute(
                "DELETE FROM interview_questions WHERE id = ?1 AND owner_id = ?2",
                params![question_id, owner_id],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn collect(rows: &mut libsql::Rows) -> Result<Vec<InterviewQuestion>> {
        let mut questions = Vec::new();
        while let Some(row) = rows.next().await? {
            questions.push(Self::row_to_question(&row)?);
        }
        Ok(questions)
    }

    fn row_to_question(row: &libsql::Row) -> Result<InterviewQuestion> {
        Ok(InterviewQuestion {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            job_id: row.get(2)?,
            question: row.get(3)?,
            answer: row.get(4)?,
            recommendation: row.get(5)?,
            created_at: parse_timestamp(&row.get::<String>(6)?),
            updated_at: parse_timestamp(&row.get::<String>(7)?),
        })
    }
}

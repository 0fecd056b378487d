use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{ArtifactKind, GeneratedArtifact};

pub struct ArtifactRepository;

fn table_for(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::CoverLetter => "cover_letters",
        ArtifactKind::ResumeRecommendation => "resume_recommendations",
    }
}

impl ArtifactRepository {
    pub async fn save(conn: &Connection, artifact: &GeneratedArtifact) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, owner_id, job_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            table_for(artifact.kind)
        );
        conn.execute(
            &sql,
            params![
                artifact.id.clone(),
                artifact.owner_id.clone(),
                artifact.job_id.clone(),
                artifact.content.clone(),
                artifact.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list(
        conn: &Connection,
        owner_id: &str,
        job_id: &str,
        kind: ArtifactKind,
    ) -> Result<Vec<GeneratedArtifact>> {
        let sql = format!(
            "SELECT id, owner_id, job_id, content, created_at FROM {}
             WHERE owner_id = ?1 AND job_id = ?2
             ORDER BY created_at ASC, rowid ASC",
            table_for(kind)
        );
        let mut rows = conn.query(&sql, params![owner_id, job_id]).await?;

        let mut artifacts = Vec::new();
        while let Some(row) = rows.next().await? {
            artifacts.push(GeneratedArtifact {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                job_id: row.get(2)?,
                kind,
                content: row.get(3)?,
                created_at: parse_timestamp(&row.get::<String>(4)?),
            });
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::test_connection;
    use chrono::Utc;

    fn artifact(kind: ArtifactKind, content: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            id: nanoid::nanoid!(),
            owner_id: "u1".to_string(),
            job_id: "j1".to_string(),
            kind,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_kinds_are_stored_separately() {
        let conn = test_connection().await;

        ArtifactRepository::save(&conn, &artifact(ArtifactKind::CoverLetter, "Dear Acme"))
            .await
            .unwrap();
        ArtifactRepository::save(
            &conn,
            &artifact(ArtifactKind::ResumeRecommendation, "Lead with impact"),
        )
        .await
        .unwrap();

        let letters = ArtifactRepository::list(&conn, "u1", "j1", ArtifactKind::CoverLetter)
            .await
            .unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].content, "Dear Acme");

        let recs = ArtifactRepository::list(&conn, "u1", "j1", ArtifactKind::ResumeRecommendation)
            .await
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, ArtifactKind::ResumeRecommendation);
    }
}

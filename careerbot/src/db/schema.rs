use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per résumé section plus the FULL RESUME row
        CREATE TABLE IF NOT EXISTS resumes (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            section_header TEXT NOT NULL,
            section_body TEXT NOT NULL,
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_resumes_owner ON resumes(owner_id);

        CREATE TABLE IF NOT EXISTS job_postings (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            company TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'saved',
            post_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_job_postings_owner ON job_postings(owner_id);

        CREATE TABLE IF NOT EXISTS job_posting_sections (
            job_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            section TEXT NOT NULL,
            content TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (job_id, section)
        );

        CREATE TABLE IF NOT EXISTS interview_questions (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            job_id TEXT,
            question TEXT NOT NULL,
            answer TEXT,
            recommendation TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_interview_questions_owner ON interview_questions(owner_id, job_id);

        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- seq keeps insertion order for messages created within the same instant
        CREATE TABLE IF NOT EXISTS chat_messages (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            chat_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_chat ON chat_messages(chat_id);

        CREATE TABLE IF NOT EXISTS cover_letters (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resume_recommendations (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS careerbot_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_connection() -> Connection {
    let conn = libsql::Builder::new_local(":memory:")
        .build()
        .await
        .unwrap()
        .connect()
        .unwrap();
    init_schema(&conn).await.unwrap();
    conn
}

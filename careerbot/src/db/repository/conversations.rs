use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{Chat, ChatMessage, MessageRole};

pub struct ConversationRepository;

impl ConversationRepository {
    pub async fn create_chat(conn: &Connection, chat: &Chat) -> Result<()> {
        conn.execute(
            "INSERT INTO chats (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                chat.id.clone(),
                chat.owner_id.clone(),
                chat.name.clone(),
                chat.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_chat(conn: &Connection, owner_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        let mut rows = conn
            .query(
                "SELECT id, owner_id, name, created_at FROM chats WHERE id = ?1 AND owner_id = ?2",
                params![chat_id, owner_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Chat {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                name: row.get(2)?,
                created_at: parse_timestamp(&row.get::<String>(3)?),
            })),
            None => Ok(None),
        }
    }

    pub async fn append_message(conn: &Connection, message: &ChatMessage) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO chat_messages (id, chat_id, owner_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                message.id.clone(),
                message.chat_id.clone(),
                message.owner_id.clone(),
                message.role.as_str(),
                message.content.clone(),
                message.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list_messages(
        conn: &Connection,
        owner_id: &str,
        chat_id: &str,
    ) -> Result<Vec<ChatMessage>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, chat_id, owner_id, role, content, created_at
                FROM chat_messages
                WHERE chat_id = ?1 AND owner_id = ?2
                ORDER BY seq ASC
                "#,
                params![chat_id, owner_id],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(ChatMessage {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                owner_id: row.get(2)?,
                role: MessageRole::parse(&row.get::<String>(3)?),
                content: row.get(4)?,
                created_at: parse_timestamp(&row.get::<String>(5)?),
            });
        }
        Ok(messages)
    }
}

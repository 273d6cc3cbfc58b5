use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::auth::error::SessionError;
use crate::auth::store::SessionStore;

const SESSION_PREFIX: &str = "refresh_session:";
const SUBJECT_PREFIX: &str = "refresh_sessions:";
const FIELD_TOKEN: &str = "token";

// KEYS[1] subject index, KEYS[2] session key
// ARGV: token id, subject, token, ttl seconds, cap, session key prefix
const PUT_SCRIPT: &str = r#"
local live = {}
for _, id in ipairs(redis.call('SMEMBERS', KEYS[1])) do
  if redis.call('EXISTS', ARGV[6] .. id) == 1 then
    table.insert(live, id)
  else
    redis.call('SREM', KEYS[1], id)
  end
end
local evicted = 0
if #live >= tonumber(ARGV[5]) then
  redis.call('DEL', ARGV[6] .. live[1])
  redis.call('SREM', KEYS[1], live[1])
  evicted = 1
end
redis.call('HSET', KEYS[2], 'subject', ARGV[2], 'token', ARGV[3])
redis.call('EXPIRE', KEYS[2], ARGV[4])
redis.call('SADD', KEYS[1], ARGV[1])
redis.call('EXPIRE', KEYS[1], ARGV[4])
return evicted
"#;

// KEYS[1] session key; ARGV: subject index prefix, token id
const DELETE_SCRIPT: &str = r#"
local subject = redis.call('HGET', KEYS[1], 'subject')
if not subject then
  return 0
end
redis.call('SREM', ARGV[1] .. subject, ARGV[2])
return redis.call('DEL', KEYS[1])
"#;

// KEYS[1] subject index; ARGV: session key prefix
const DELETE_SUBJECT_SCRIPT: &str = r#"
local deleted = 0
for _, id in ipairs(redis.call('SMEMBERS', KEYS[1])) do
  deleted = deleted + redis.call('DEL', ARGV[1] .. id)
end
redis.call('DEL', KEYS[1])
return deleted
"#;

/// Redis-backed session store.
///
/// Layout: `refresh_session:{token_id}` is a hash holding the subject and the
/// signed token with the session TTL; `refresh_sessions:{subject}` is the set
/// of that subject's token ids. Writes run as Lua scripts so the cap check,
/// eviction and insert happen atomically.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    max_sessions: usize,
    put_script: Arc<Script>,
    delete_script: Arc<Script>,
    delete_subject_script: Arc<Script>,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, max_sessions: usize) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn, max_sessions))
    }

    pub fn with_connection(conn: ConnectionManager, max_sessions: usize) -> Self {
        Self {
            conn,
            max_sessions: max_sessions.max(1),
            put_script: Arc::new(Script::new(PUT_SCRIPT)),
            delete_script: Arc::new(Script::new(DELETE_SCRIPT)),
            delete_subject_script: Arc::new(Script::new(DELETE_SUBJECT_SCRIPT)),
        }
    }
}

fn session_key(token_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, token_id)
}

fn subject_key(subject: &str) -> String {
    format!("{}{}", SUBJECT_PREFIX, subject)
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        subject: &str,
        token_id: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let evicted: i64 = self
            .put_script
            .key(subject_key(subject))
            .key(session_key(token_id))
            .arg(token_id)
            .arg(subject)
            .arg(token)
            .arg(ttl_seconds(ttl))
            .arg(self.max_sessions)
            .arg(SESSION_PREFIX)
            .invoke_async(&mut conn)
            .await?;
        if evicted > 0 {
            log::debug!("session cap reached for {}, evicted one session", subject);
        }
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<String, SessionError> {
        let mut conn = self.conn.clone();
        let token: Option<String> = conn.hget(session_key(token_id), FIELD_TOKEN).await?;
        token.ok_or(SessionError::NotFound)
    }

    async fn delete(&self, token_id: &str) -> Result<u64, SessionError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = self
            .delete_script
            .key(session_key(token_id))
            .arg(SUBJECT_PREFIX)
            .arg(token_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted)
    }

    async fn delete_subject(&self, subject: &str) -> Result<u64, SessionError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = self
            .delete_subject_script
            .key(subject_key(subject))
            .arg(SESSION_PREFIX)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted)
    }
}

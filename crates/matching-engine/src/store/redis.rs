//! Redis streams implementation of the log store
//!
//! Blocking reads occupy the connection they run on, so every market
//! worker opens its own `RedisLogStore`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Value;
use tracing::{debug, info};

use crate::codec::StreamFields;
use crate::store::limits::{
    check_block_ms, check_count, flatten_fields, MAX_GROUP_READ_COUNT, MAX_TAIL_READ_COUNT,
};
use crate::store::reply::{
    parse_id_reply, parse_integer_reply, parse_last_entry_reply, parse_stream_read_reply,
};
use crate::store::traits::{
    GroupRead, GroupStart, LogStore, StoreError, StoreResult, StreamRecord,
};
use config::RedisConfig;

/// Log store backed by Redis streams
#[derive(Clone)]
pub struct RedisLogStore {
    conn: ConnectionManager,
}

impl RedisLogStore {
    /// Connect to Redis
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        info!(host = %config.host, port = config.port, db = config.db_index, "Connecting to Redis");

        let url = config
            .connection_url()
            .map_err(|e| StoreError::InvalidArgument {
                name: "redis",
                reason: e.to_string(),
            })?;
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;

        Ok(Self { conn })
    }

    async fn query(&self, cmd: &redis::Cmd) -> StoreResult<Value> {
        let mut conn = self.conn.clone();
        let reply = cmd.query_async::<_, Value>(&mut conn).await?;
        Ok(reply)
    }
}

fn is_busy_group(err: &redis::RedisError) -> bool {
    err.code() == Some("BUSYGROUP") || err.to_string().contains("BUSYGROUP")
}

#[async_trait]
impl LogStore for RedisLogStore {
    async fn append(&self, stream: &str, fields: &StreamFields) -> StoreResult<String> {
        let flat = flatten_fields(fields)?;

        let mut cmd = redis::cmd("XADD");
        cmd.arg(stream).arg("*").arg(flat);
        let reply = self.query(&cmd).await?;

        parse_id_reply(&reply)
    }

    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
        start: GroupStart,
    ) -> StoreResult<()> {
        let mut cmd = redis::cmd("XGROUP");
        cmd.arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg(start.as_id())
            .arg("MKSTREAM");

        match self.query(&cmd).await {
            Ok(_) => {
                info!(stream = %stream, group = %group, "Created consumer group");
                Ok(())
            }
            Err(StoreError::Redis(e)) if is_busy_group(&e) => {
                debug!(stream = %stream, group = %group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> StoreResult<u64> {
        let mut cmd = redis::cmd("XACK");
        cmd.arg(stream).arg(group).arg(id);
        let reply = self.query(&cmd).await?;

        let acked = parse_integer_reply(&reply)?;
        u64::try_from(acked).map_err(|_| StoreError::InvalidReply(format!("negative ack count {acked}")))
    }

    async fn read_group(&self, read: GroupRead<'_>) -> StoreResult<Vec<StreamRecord>> {
        let count = check_count(read.count, MAX_GROUP_READ_COUNT)?;
        let block_ms = check_block_ms(read.block_ms)?;

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(read.group)
            .arg(read.consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(read.stream)
            .arg(read.cursor.as_id());
        let reply = self.query(&cmd).await?;

        parse_stream_read_reply(&reply)
    }

    async fn read_since(
        &self,
        stream: &str,
        after_id: &str,
        count: usize,
        block_ms: u64,
    ) -> StoreResult<Vec<StreamRecord>> {
        let count = check_count(count, MAX_TAIL_READ_COUNT)?;
        let block_ms = check_block_ms(block_ms)?;

        let mut cmd = redis::cmd("XREAD");
        cmd.arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(stream)
            .arg(after_id);
        let reply = self.query(&cmd).await?;

        parse_stream_read_reply(&reply)
    }

    async fn last_entry_id(&self, stream: &str) -> StoreResult<Option<String>> {
        let mut cmd = redis::cmd("XREVRANGE");
        cmd.arg(stream).arg("+").arg("-").arg("COUNT").arg(1);
        let reply = self.query(&cmd).await?;

        parse_last_entry_reply(&reply)
    }

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<u64> {
        let mut cmd = redis::cmd("PUBLISH");
        cmd.arg(channel).arg(message);
        let reply = self.query(&cmd).await?;

        let receivers = parse_integer_reply(&reply)?;
        Ok(u64::try_from(receivers).unwrap_or(0))
    }
}

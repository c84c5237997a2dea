//! Redis-list-backed `Publisher`: this workspace has no AMQP client, so each
//! queue is a Redis list and `routing_key` is folded into the list name.
//! Noted in DESIGN.md.

use async_trait::async_trait;
use productcrawl_events::Publisher;
use redis::AsyncCommands;

pub struct RedisListPublisher {
    client: redis::Client,
    queue_name: String,
}

impl RedisListPublisher {
    pub fn new(redis_addr: &str, queue_name: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(format!("redis://{redis_addr}"))?;
        Ok(Self { client, queue_name: queue_name.into() })
    }
}

#[async_trait]
impl Publisher for RedisListPublisher {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_tokio_connection().await?;
        let list = format!("{}:{}", self.queue_name, routing_key);
        let _: () = conn.rpush(list, payload).await?;
        Ok(())
    }
}

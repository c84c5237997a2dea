//! Queue `Publisher` contract. The wire transport (RabbitMQ channel,
//! exchange declaration) is an injected collaborator; this crate only
//! fixes the publish contract and the payload shapes that cross it.

use async_trait::async_trait;

#[async_trait]
pub trait Publisher: Send + Sync {
    fn queue_name(&self) -> &str;

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingPublisher {
        pub name: String,
        pub published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RecordingPublisher {
        pub fn new(name: &str) -> Self {
            Self { name: name.to_string(), published: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn queue_name(&self) -> &str {
            &self.name
        }

        async fn publish(&self, routing_key: &str, payload: &[u8]) -> anyhow::Result<()> {
            self.published.lock().await.push((routing_key.to_string(), payload.to_vec()));
            Ok(())
        }
    }
}

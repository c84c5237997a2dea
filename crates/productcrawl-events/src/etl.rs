//! Raw/processing-pipeline ETL fan-out: every variation goes to the raw
//! queue, and also to the processing-pipeline queue unless the site is
//! `skus_only`.

use crate::messages::RawEtlMessage;
use crate::publisher::Publisher;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EtlPublishCounts {
    pub raw: usize,
    pub processing_pipeline: usize,
}

pub async fn publish_msgs_to_etl(
    raw_publisher: &dyn Publisher,
    pp_publisher: &dyn Publisher,
    msgs: &[RawEtlMessage],
) -> anyhow::Result<EtlPublishCounts> {
    let mut counts = EtlPublishCounts::default();
    for msg in msgs {
        let payload = serde_json::to_vec(msg)?;
        raw_publisher.publish(&msg.msg_id, &payload).await?;
        counts.raw += 1;

        if !msg.skus_only {
            pp_publisher.publish(&msg.msg_id, &payload).await?;
            counts.processing_pipeline += 1;
        }
    }
    tracing::info!(raw = counts.raw, pp = counts.processing_pipeline, "ETL_PUBLISH_SUCCESS");
    Ok(counts)
}

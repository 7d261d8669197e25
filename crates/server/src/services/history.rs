/// 历史数据合并
///
/// 将已存储的样本与本次实时采集结果合并为按时间排列的数据点序列。
/// 实时点总是追加在最后，不与时间相近的历史点去重。

use chrono::{DateTime, Utc};
use common::models::{ContainerSnapshot, DataPoint, SamplePayload, SystemSnapshot};
use tracing::warn;

use crate::db::models::sample::Model as SampleModel;

/// 可以转换为实时数据点的快照
pub trait LivePoint {
    fn live_point(&self, at: DateTime<Utc>) -> DataPoint;
}

impl LivePoint for SystemSnapshot {
    fn live_point(&self, at: DateTime<Utc>) -> DataPoint {
        DataPoint::from_system(self, at)
    }
}

impl LivePoint for ContainerSnapshot {
    fn live_point(&self, at: DateTime<Utc>) -> DataPoint {
        DataPoint::from_container(self, at)
    }
}

/// 把一条历史样本解码为数据点
pub fn decode_sample(sample: &SampleModel) -> DataPoint {
    let payload = sample.raw_payload.as_ref().and_then(|raw| {
        match serde_json::from_value::<SamplePayload>(raw.clone()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("样本 {} 的原始数据无法解析: {}", sample.id, e);
                None
            }
        }
    });
    let network = payload.as_ref().map(SamplePayload::network_totals);

    DataPoint {
        timestamp: sample.timestamp.with_timezone(&Utc),
        cpu_percent: sample.primary_value,
        memory_percent: sample.memory_percent,
        disk_percent: sample.disk_percent,
        network_rx_bytes: network.map(|(rx, _)| rx),
        network_tx_bytes: network.map(|(_, tx)| tx),
        live: false,
    }
}

/// 合并历史样本与实时快照
pub fn merge<L: LivePoint>(
    live: Option<&L>,
    historical: &[SampleModel],
    now: DateTime<Utc>,
) -> Vec<DataPoint> {
    let mut points: Vec<DataPoint> = historical.iter().map(decode_sample).collect();
    if let Some(live) = live {
        points.push(live.live_point(now));
    }
    points
}

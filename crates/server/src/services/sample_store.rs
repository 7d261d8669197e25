/// 样本存储服务
///
/// 只追加写入；按主机 + 指标类型 + 时间范围查询；主机注销时级联删除

use chrono::{DateTime, Utc};
use common::{HostAddr, MetricKind, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::db::models::sample::{
    ActiveModel as SampleActiveModel, Column as SampleColumn, Entity as SampleEntity,
    Model as SampleModel, NewSample,
};
use crate::db::models::threshold::{Column as ThresholdColumn, Entity as ThresholdEntity};
use crate::db::storage_error;

#[derive(Clone)]
pub struct SampleStore {
    db: DatabaseConnection,
}

impl SampleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 写入一条样本
    pub async fn append(&self, sample: NewSample) -> Result<SampleModel> {
        let raw_payload = sample
            .payload
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let sample_active = SampleActiveModel {
            host: Set(sample.host.to_string()),
            metric_kind: Set(sample.kind.as_db_value()),
            primary_value: Set(sample.primary_value),
            memory_percent: Set(sample.memory_percent),
            disk_percent: Set(sample.disk_percent),
            raw_payload: Set(raw_payload),
            timestamp: Set(sample.timestamp.into()),
            ..Default::default()
        };

        let stored = sample_active.insert(&self.db).await.map_err(storage_error)?;
        debug!(
            "写入样本: host={}, kind={}, value={}",
            stored.host, stored.metric_kind, stored.primary_value
        );

        Ok(stored)
    }

    /// 查询 `[since, until]` 内的样本，按时间升序
    pub async fn query_range(
        &self,
        host: &HostAddr,
        kind: &MetricKind,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<SampleModel>> {
        if since > until {
            return Ok(Vec::new());
        }

        SampleEntity::find()
            .filter(SampleColumn::Host.eq(host.as_str()))
            .filter(SampleColumn::MetricKind.eq(kind.as_db_value()))
            .filter(SampleColumn::Timestamp.gte(since.fixed_offset()))
            .filter(SampleColumn::Timestamp.lte(until.fixed_offset()))
            .order_by_asc(SampleColumn::Timestamp)
            .order_by_asc(SampleColumn::Id)
            .all(&self.db)
            .await
            .map_err(storage_error)
    }

    /// 查询指标类型以 `prefix` 开头的样本（例如所有 `docker_` 样本），按时间升序
    pub async fn query_kind_prefix(
        &self,
        host: &HostAddr,
        prefix: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<SampleModel>> {
        if since > until {
            return Ok(Vec::new());
        }

        let samples = SampleEntity::find()
            .filter(SampleColumn::Host.eq(host.as_str()))
            .filter(SampleColumn::MetricKind.starts_with(prefix))
            .filter(SampleColumn::Timestamp.gte(since.fixed_offset()))
            .filter(SampleColumn::Timestamp.lte(until.fixed_offset()))
            .order_by_asc(SampleColumn::Timestamp)
            .order_by_asc(SampleColumn::Id)
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        // LIKE 中的 `_` 是通配符，这里再精确过滤一次
        Ok(samples
            .into_iter()
            .filter(|sample| sample.metric_kind.starts_with(prefix))
            .collect())
    }

    /// 删除主机的全部样本与阈值（同一事务）
    pub async fn delete_all_for_host(&self, host: &HostAddr) -> Result<u64> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        let removed = purge_host(&txn, host).await.map_err(storage_error)?;
        txn.commit().await.map_err(storage_error)?;

        info!("已删除主机 {} 的 {} 条样本", host, removed);
        Ok(removed)
    }
}

/// 在给定连接（通常是事务）上删除主机的样本与阈值，返回删除的样本数
pub async fn purge_host<C: ConnectionTrait>(conn: &C, host: &HostAddr) -> std::result::Result<u64, DbErr> {
    let samples = SampleEntity::delete_many()
        .filter(SampleColumn::Host.eq(host.as_str()))
        .exec(conn)
        .await?;

    ThresholdEntity::delete_many()
        .filter(ThresholdColumn::Host.eq(host.as_str()))
        .exec(conn)
        .await?;

    Ok(samples.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::snapshot_with_cpu;
    use crate::db::setup_test_db;
    use crate::services::threshold_service::ThresholdService;
    use chrono::{Duration, TimeZone};
    use common::models::ThresholdLevels;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn host(addr: &str) -> HostAddr {
        HostAddr::parse(addr).unwrap()
    }

    async fn append_cpu(store: &SampleStore, host: &HostAddr, cpu: f64, at: DateTime<Utc>) {
        store
            .append(NewSample::system(host, &snapshot_with_cpu(cpu), at))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_range_bounds_and_order() {
        let store = SampleStore::new(setup_test_db().await);
        let h = host("10.0.0.5");

        // 乱序写入
        for (minute, cpu) in [(30, 3.0), (10, 1.0), (50, 5.0), (20, 2.0), (40, 4.0)] {
            append_cpu(&store, &h, cpu, t(minute)).await;
        }

        let samples = store.query_range(&h, &MetricKind::System, t(20), t(40)).await.unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.primary_value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);

        for pair in samples.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        for sample in &samples {
            let ts = sample.timestamp.with_timezone(&Utc);
            assert!(ts >= t(20) && ts <= t(40));
        }
    }

    #[tokio::test]
    async fn test_query_range_empty_cases() {
        let store = SampleStore::new(setup_test_db().await);
        let h = host("10.0.0.5");
        append_cpu(&store, &h, 1.0, t(10)).await;

        assert!(store.query_range(&h, &MetricKind::System, t(11), t(20)).await.unwrap().is_empty());
        assert!(store.query_range(&h, &MetricKind::System, t(20), t(0)).await.unwrap().is_empty());
        assert!(store
            .query_range(&h, &MetricKind::container("web"), t(0), t(59))
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .query_range(&host("10.0.0.6"), &MetricKind::System, t(0), t(59))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_payload_is_stored() {
        let store = SampleStore::new(setup_test_db().await);
        let stored = store
            .append(NewSample::system(&HostAddr::local(), &snapshot_with_cpu(12.0), t(5)))
            .await
            .unwrap();
        assert_eq!(stored.metric_kind, "system");
        assert_eq!(stored.host, "localhost");
        assert_eq!(stored.memory_percent, Some(50.0));
        assert_eq!(stored.raw_payload.unwrap()["kind"], "system");
    }

    #[tokio::test]
    async fn test_query_kind_prefix() {
        let store = SampleStore::new(setup_test_db().await);
        let h = HostAddr::local();
        let mut web = common::models::ContainerSnapshot::placeholder("web", "a");
        web.cpu_percent = 1.0;
        let mut db = common::models::ContainerSnapshot::placeholder("db", "b");
        db.cpu_percent = 2.0;

        store.append(NewSample::container(&h, &web, t(1))).await.unwrap();
        store.append(NewSample::container(&h, &db, t(2))).await.unwrap();
        append_cpu(&store, &h, 9.0, t(3)).await;

        let samples = store.query_kind_prefix(&h, "docker_", t(0), t(59)).await.unwrap();
        let kinds: Vec<_> = samples.iter().map(|s| s.metric_kind.as_str()).collect();
        assert_eq!(kinds, vec!["docker_web", "docker_db"]);
    }

    #[tokio::test]
    async fn test_delete_all_for_host_cascades() {
        let db = setup_test_db().await;
        let store = SampleStore::new(db.clone());
        let thresholds = ThresholdService::new(db);
        let h = host("10.0.0.5");
        let other = host("10.0.0.6");

        append_cpu(&store, &h, 1.0, t(1)).await;
        append_cpu(&store, &h, 2.0, t(2)).await;
        append_cpu(&store, &other, 3.0, t(3)).await;
        thresholds
            .set(&h, ThresholdLevels { cpu: 50.0, memory: 60.0, disk: 70.0 })
            .await
            .unwrap();

        assert_eq!(store.delete_all_for_host(&h).await.unwrap(), 2);

        let far_past = t(0) - Duration::days(365 * 100);
        let far_future = t(0) + Duration::days(365 * 100);
        assert!(store
            .query_range(&h, &MetricKind::System, far_past, far_future)
            .await
            .unwrap()
            .is_empty());
        assert!(thresholds.get(&h).await.unwrap().is_default);

        // 其他主机不受影响
        assert_eq!(
            store.query_range(&other, &MetricKind::System, far_past, far_future).await.unwrap().len(),
            1
        );
    }
}

/// 指标查询服务
///
/// 组合采集器、样本存储、历史合并与告警阈值，对外提供仪表盘所需的查询

use chrono::{DateTime, Duration, Utc};
use common::models::{Alert, ContainerSnapshot, DataPoint, SystemSnapshot};
use common::models::constants::CONTAINER_KIND_PREFIX;
use common::{Error, HostAddr, MetricKind, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::db::models::sample::{Model as SampleModel, NewSample};
use crate::services::history::merge;
use crate::services::host_service::HostService;
use crate::services::sample_store::SampleStore;
use crate::services::threshold_service::ThresholdService;

/// 未指定 timeRange 时的查询窗口
pub const DEFAULT_TIME_RANGE: &str = "1h";

/// 实时系统指标
#[derive(Debug, Serialize)]
pub struct LiveSystemResponse {
    pub host: String,
    pub collected_at: DateTime<Utc>,
    pub snapshot: SystemSnapshot,
    pub alerts: Vec<Alert>,
}

/// 系统指标历史
#[derive(Debug, Serialize)]
pub struct SystemHistoryResponse {
    pub host: String,
    /// 本次请求是否拿到了实时数据
    pub live_available: bool,
    pub points: Vec<DataPoint>,
}

/// 单个容器的实时快照与历史
#[derive(Debug, Serialize)]
pub struct ContainerMetrics {
    pub snapshot: ContainerSnapshot,
    pub history: Vec<DataPoint>,
}

#[derive(Debug, Serialize)]
pub struct ContainerOverviewResponse {
    pub host: String,
    pub containers: Vec<ContainerMetrics>,
}

/// 按容器名分组的历史
#[derive(Debug, Serialize)]
pub struct ContainerHistoryResponse {
    pub host: String,
    pub containers: BTreeMap<String, Vec<DataPoint>>,
}

pub struct MetricsService {
    state: AppState,
}

impl MetricsService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn store(&self) -> SampleStore {
        SampleStore::new(self.state.sea_db())
    }

    /// 采集一次主机指标并写入样本
    async fn collect_and_store(&self, host: &HostAddr) -> Result<(SystemSnapshot, DateTime<Utc>)> {
        let source = if host.is_local() { "local" } else { "remote" };
        let result = self.state.host_collector().collect(host).await;
        self.state.telemetry.record_collection(source, result.is_ok());
        let snapshot = result?;

        let collected_at = Utc::now();
        self.store()
            .append(NewSample::system(host, &snapshot, collected_at))
            .await?;
        self.state.telemetry.record_sample();

        Ok((snapshot, collected_at))
    }

    /// 实时系统指标 + 告警
    pub async fn live_system(&self, host: &HostAddr) -> Result<LiveSystemResponse> {
        HostService::new(self.state.clone()).ensure_known(host).await?;

        let (snapshot, collected_at) = self.collect_and_store(host).await?;

        let thresholds = ThresholdService::new(self.state.sea_db()).get(host).await?;
        let alerts = thresholds.levels().evaluate(&snapshot);
        if !alerts.is_empty() {
            warn!("主机 {} 触发 {} 条告警", host, alerts.len());
        }

        Ok(LiveSystemResponse {
            host: host.to_string(),
            collected_at,
            snapshot,
            alerts,
        })
    }

    /// 系统指标历史，末尾附带本次实时数据（若采集成功）
    pub async fn system_history(&self, host: &HostAddr, window: Duration) -> Result<SystemHistoryResponse> {
        HostService::new(self.state.clone()).ensure_known(host).await?;

        let now = Utc::now();
        let since = window_start(now, window)?;
        let historical = self
            .store()
            .query_range(host, &MetricKind::System, since, now)
            .await?;

        let live = match self.collect_and_store(host).await {
            Ok(live) => Some(live),
            Err(e) if e.is_collection() => {
                warn!("主机 {} 实时采集失败，仅返回历史数据: {}", host, e);
                None
            }
            Err(e) => return Err(e),
        };

        let points = match &live {
            Some((snapshot, collected_at)) => merge(Some(snapshot), &historical, *collected_at),
            None => merge::<SystemSnapshot>(None, &historical, now),
        };

        Ok(SystemHistoryResponse {
            host: host.to_string(),
            live_available: live.is_some(),
            points,
        })
    }

    /// 容器概览：每个运行中容器的实时快照与默认窗口内的历史
    pub async fn container_overview(&self, host: &HostAddr) -> Result<ContainerOverviewResponse> {
        ensure_local_runtime(host)?;

        let window = parse_time_range(DEFAULT_TIME_RANGE)?;
        let live = self.collect_containers(host).await?;
        let now = Utc::now();
        let since = window_start(now, window)?;
        let store = self.store();

        let mut containers = Vec::with_capacity(live.len());
        for snapshot in live {
            let historical = store
                .query_range(host, &MetricKind::container(&snapshot.name), since, now)
                .await?;
            let history = merge(live_container(&snapshot), &historical, now);
            containers.push(ContainerMetrics { snapshot, history });
        }

        self.persist_containers(host, containers.iter().map(|c| &c.snapshot), now)
            .await?;

        Ok(ContainerOverviewResponse {
            host: host.to_string(),
            containers,
        })
    }

    /// 窗口内所有容器的历史，按容器名分组
    pub async fn container_history(&self, host: &HostAddr, window: Duration) -> Result<ContainerHistoryResponse> {
        ensure_local_runtime(host)?;

        let now = Utc::now();
        let since = window_start(now, window)?;
        let historical = self
            .store()
            .query_kind_prefix(host, CONTAINER_KIND_PREFIX, since, now)
            .await?;

        let mut grouped: BTreeMap<String, Vec<SampleModel>> = BTreeMap::new();
        for sample in historical {
            match MetricKind::from_db_value(&sample.metric_kind) {
                Some(MetricKind::Container(name)) => grouped.entry(name).or_default().push(sample),
                _ => warn!("忽略无法识别的指标类型: {}", sample.metric_kind),
            }
        }

        let live = self.collect_containers(host).await?;
        let live_by_name: BTreeMap<&str, &ContainerSnapshot> = live
            .iter()
            .filter(|snapshot| !snapshot.is_placeholder())
            .map(|snapshot| (snapshot.name.as_str(), snapshot))
            .collect();

        let mut containers: BTreeMap<String, Vec<DataPoint>> = grouped
            .iter()
            .map(|(name, samples)| {
                let live = live_by_name.get(name.as_str()).copied();
                (name.clone(), merge(live, samples, now))
            })
            .collect();
        for snapshot in live_by_name.values() {
            containers
                .entry(snapshot.name.clone())
                .or_insert_with(|| merge(Some(*snapshot), &[], now));
        }

        self.persist_containers(host, live.iter(), now).await?;

        Ok(ContainerHistoryResponse {
            host: host.to_string(),
            containers,
        })
    }

    /// 采集容器；运行时不可用时退化为空列表
    async fn collect_containers(&self, host: &HostAddr) -> Result<Vec<ContainerSnapshot>> {
        let result = self.state.container_collector().collect().await;
        self.state.telemetry.record_collection("container", result.is_ok());
        match result {
            Ok(containers) => Ok(containers),
            Err(e) if e.is_collection() => {
                warn!("主机 {} 容器采集失败: {}", host, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// 写入容器样本，占位快照不入库
    async fn persist_containers<'a>(
        &self,
        host: &HostAddr,
        snapshots: impl Iterator<Item = &'a ContainerSnapshot>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let store = self.store();
        let mut stored = 0;
        for snapshot in snapshots.filter(|snapshot| !snapshot.is_placeholder()) {
            store.append(NewSample::container(host, snapshot, at)).await?;
            self.state.telemetry.record_sample();
            stored += 1;
        }
        info!("主机 {} 写入 {} 条容器样本", host, stored);
        Ok(())
    }
}

/// 占位快照不作为实时点，避免曲线出现虚假的 0 值
fn live_container(snapshot: &ContainerSnapshot) -> Option<&ContainerSnapshot> {
    (!snapshot.is_placeholder()).then_some(snapshot)
}

/// 查询窗口起点；窗口超出可表示的时间范围时视为无效参数
fn window_start(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_sub_signed(window)
        .ok_or_else(|| Error::InvalidArgument(format!("时间范围过大: {}", window)))
}

fn ensure_local_runtime(host: &HostAddr) -> Result<()> {
    if host.is_local() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "容器指标仅支持本机，{} 不是本机",
            host
        )))
    }
}

/// 解析查询窗口：`1h` / `6h` / `24h` / `7d`，或任意 `<n>m|h|d`
pub fn parse_time_range(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || Error::InvalidArgument(format!("无效的时间范围: {}", raw));

    if raw.len() < 2 {
        return Err(invalid());
    }
    let (amount, unit) = raw.split_at(raw.len() - 1);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => None,
    };
    duration.ok_or_else(invalid)
}

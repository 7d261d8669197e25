/// 时序样本数据模型
use chrono::{DateTime, Utc};
use common::models::{ContainerSnapshot, SamplePayload, SystemSnapshot};
use common::{HostAddr, MetricKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 样本模型（写入后不再修改）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "samples")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub host: String,
    pub metric_kind: String,
    #[sea_orm(column_type = "Double")]
    pub primary_value: f64,
    #[sea_orm(column_type = "Double", nullable)]
    pub memory_percent: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub disk_percent: Option<f64>,
    pub raw_payload: Option<Json>,
    pub timestamp: DateTimeWithTimeZone,
}

// 本机不入 hosts 表，因此不声明外键，级联删除由 SampleStore 负责
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 待写入的样本
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub host: HostAddr,
    pub kind: MetricKind,
    pub primary_value: f64,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub payload: Option<SamplePayload>,
    pub timestamp: DateTime<Utc>,
}

impl NewSample {
    /// 主机级样本：主值为 CPU 使用率
    pub fn system(host: &HostAddr, snapshot: &SystemSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            host: host.clone(),
            kind: MetricKind::System,
            primary_value: snapshot.cpu_percent,
            memory_percent: Some(snapshot.memory.percent),
            disk_percent: Some(snapshot.primary_disk_percent()),
            payload: Some(SamplePayload::from(snapshot)),
            timestamp: at,
        }
    }

    /// 容器级样本，类型为 `docker_<name>`
    pub fn container(host: &HostAddr, snapshot: &ContainerSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            host: host.clone(),
            kind: MetricKind::container(&snapshot.name),
            primary_value: snapshot.cpu_percent,
            memory_percent: Some(snapshot.memory_percent),
            disk_percent: None,
            payload: Some(SamplePayload::from(snapshot)),
            timestamp: at,
        }
    }
}

/// 告警阈值服务

use chrono::{DateTime, Utc};
use common::models::ThresholdLevels;
use common::{Error, HostAddr, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tracing::info;

use crate::db::models::threshold::{
    ActiveModel as ThresholdActiveModel, Column as ThresholdColumn, Entity as ThresholdEntity,
    ThresholdResponse,
};
use crate::db::storage_error;

#[derive(Clone)]
pub struct ThresholdService {
    db: DatabaseConnection,
}

impl ThresholdService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 获取阈值，未配置时返回默认值 80/80/80
    pub async fn get(&self, host: &HostAddr) -> Result<ThresholdResponse> {
        let threshold = ThresholdEntity::find_by_id(host.to_string())
            .one(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(threshold
            .map(ThresholdResponse::from)
            .unwrap_or_else(|| ThresholdResponse::default_for(host.as_str())))
    }

    /// 设置阈值（不存在则创建，存在则更新）
    pub async fn set(&self, host: &HostAddr, levels: ThresholdLevels) -> Result<ThresholdResponse> {
        self.upsert_at(host, levels, Utc::now()).await
    }

    /// 单条 `INSERT ... ON CONFLICT (host) DO UPDATE`，并发写入同一主机时不会丢失
    async fn upsert_at(
        &self,
        host: &HostAddr,
        levels: ThresholdLevels,
        now: DateTime<Utc>,
    ) -> Result<ThresholdResponse> {
        let db = &self.db;

        let threshold_active = ThresholdActiveModel {
            host: Set(host.to_string()),
            cpu_threshold: Set(levels.cpu),
            memory_threshold: Set(levels.memory),
            disk_threshold: Set(levels.disk),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        ThresholdEntity::insert(threshold_active)
            .on_conflict(
                OnConflict::column(ThresholdColumn::Host)
                    .update_columns([
                        ThresholdColumn::CpuThreshold,
                        ThresholdColumn::MemoryThreshold,
                        ThresholdColumn::DiskThreshold,
                        ThresholdColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(storage_error)?;

        let stored = ThresholdEntity::find_by_id(host.to_string())
            .one(db)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| Error::Internal(format!("主机 {} 的阈值写入后未找到", host)))?;

        info!(
            "更新主机 {} 的告警阈值: cpu={}, memory={}, disk={}",
            host, levels.cpu, levels.memory, levels.disk
        );

        Ok(ThresholdResponse::from(stored))
    }
}

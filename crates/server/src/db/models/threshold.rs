use chrono::{DateTime, Utc};
use common::models::ThresholdLevels;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 告警阈值模型（每台主机至多一行）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "thresholds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub host: String,
    #[sea_orm(column_type = "Double")]
    pub cpu_threshold: f64,
    #[sea_orm(column_type = "Double")]
    pub memory_threshold: f64,
    #[sea_orm(column_type = "Double")]
    pub disk_threshold: f64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 设置阈值 DTO（取值范围只在 API 边界校验）
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateThresholdDto {
    #[validate(range(min = 0.0, max = 100.0))]
    pub cpu_threshold: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub memory_threshold: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub disk_threshold: f64,
}

/// 阈值响应 DTO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResponse {
    pub host: String,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    /// 未配置时返回默认值
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThresholdResponse {
    pub fn default_for(host: &str) -> Self {
        let levels = ThresholdLevels::default();
        Self {
            host: host.to_string(),
            cpu_threshold: levels.cpu,
            memory_threshold: levels.memory,
            disk_threshold: levels.disk,
            is_default: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn levels(&self) -> ThresholdLevels {
        ThresholdLevels {
            cpu: self.cpu_threshold,
            memory: self.memory_threshold,
            disk: self.disk_threshold,
        }
    }
}

impl From<Model> for ThresholdResponse {
    fn from(threshold: Model) -> Self {
        Self {
            host: threshold.host,
            cpu_threshold: threshold.cpu_threshold,
            memory_threshold: threshold.memory_threshold,
            disk_threshold: threshold.disk_threshold,
            is_default: false,
            created_at: Some(threshold.created_at.with_timezone(&Utc)),
            updated_at: Some(threshold.updated_at.with_timezone(&Utc)),
        }
    }
}

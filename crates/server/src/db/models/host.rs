use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 已注册的远程主机（本机隐式存在，不入表）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hosts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub address: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 注册主机 DTO
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateHostDto {
    #[validate(length(min = 1, max = 253))]
    pub address: String,
}

/// 主机响应 DTO
#[derive(Debug, Serialize, Deserialize)]
pub struct HostResponse {
    pub address: String,
    pub is_local: bool,
    pub created_at: Option<String>,
}

impl From<Model> for HostResponse {
    fn from(host: Model) -> Self {
        Self {
            address: host.address,
            is_local: false,
            created_at: Some(host.created_at.to_rfc3339()),
        }
    }
}

impl HostResponse {
    pub fn local() -> Self {
        Self {
            address: common::HostAddr::local().to_string(),
            is_local: true,
            created_at: None,
        }
    }
}

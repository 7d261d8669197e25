/// 应用全局状态

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::collectors::{ContainerCollector, HostCollector};
use crate::telemetry::Telemetry;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// SeaORM 数据库连接
    pub sea_db: DatabaseConnection,
    /// 主机指标采集器（本机 / 远程转发）
    pub host_collector: Arc<dyn HostCollector>,
    /// 本机容器指标采集器
    pub container_collector: Arc<ContainerCollector>,
    pub telemetry: Arc<Telemetry>,
    /// 校验 Bearer token 的密钥
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(
        sea_db: DatabaseConnection,
        host_collector: Arc<dyn HostCollector>,
        container_collector: Arc<ContainerCollector>,
        telemetry: Arc<Telemetry>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            sea_db,
            host_collector,
            container_collector,
            telemetry,
            jwt_secret: Arc::new(jwt_secret.into()),
        }
    }

    /// 获取 SeaORM 数据库连接（克隆）
    pub fn sea_db(&self) -> DatabaseConnection {
        self.sea_db.clone()
    }

    pub fn host_collector(&self) -> Arc<dyn HostCollector> {
        self.host_collector.clone()
    }

    pub fn container_collector(&self) -> Arc<ContainerCollector> {
        self.container_collector.clone()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::collectors::docker::ContainerRuntime;
    use crate::collectors::testing::{FakeRuntime, ScriptedHostCollector};
    use crate::db::setup_test_db;

    pub const TEST_SECRET: &str = "test-secret";

    /// 使用内存数据库与替身采集器构造应用状态
    pub async fn test_state(
        host_collector: Arc<ScriptedHostCollector>,
        runtime: FakeRuntime,
    ) -> AppState {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(runtime);
        AppState::new(
            setup_test_db().await,
            host_collector,
            Arc::new(ContainerCollector::new(runtime)),
            Arc::new(Telemetry::new().unwrap()),
            TEST_SECRET,
        )
    }
}

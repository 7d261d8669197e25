/// 主机管理服务
///
/// 本机隐式存在且不可删除；其他主机必须先注册才能查询

use chrono::Utc;
use common::{Error, HostAddr, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, TransactionTrait};
use tracing::info;

use crate::app_state::AppState;
use crate::db::models::host::{
    ActiveModel as HostActiveModel, Column as HostColumn, Entity as HostEntity, HostResponse,
    Model as HostModel,
};
use crate::db::storage_error;
use crate::services::sample_store::purge_host;

pub struct HostService {
    state: AppState,
}

impl HostService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 注册远程主机
    pub async fn register(&self, host: &HostAddr) -> Result<HostResponse> {
        if host.is_local() {
            return Err(Error::AlreadyExists("本机无需注册".to_string()));
        }

        let db = &self.state.sea_db();

        // 主键冲突时不插入，由受影响行数判断是否已注册
        let stored = HostModel {
            address: host.to_string(),
            created_at: Utc::now().into(),
        };
        let inserted = HostEntity::insert(HostActiveModel::from(stored.clone()))
            .on_conflict(OnConflict::column(HostColumn::Address).do_nothing().to_owned())
            .exec_without_returning(db)
            .await
            .map_err(storage_error)?;
        if inserted == 0 {
            return Err(Error::AlreadyExists(format!("主机 {} 已注册", host)));
        }
        info!("注册主机: {}", host);

        Ok(HostResponse::from(stored))
    }

    /// 主机列表：本机在前，其余按地址排序
    pub async fn list(&self) -> Result<Vec<HostResponse>> {
        let db = &self.state.sea_db();

        let hosts = HostEntity::find()
            .order_by_asc(HostColumn::Address)
            .all(db)
            .await
            .map_err(storage_error)?;

        let mut responses = Vec::with_capacity(hosts.len() + 1);
        responses.push(HostResponse::local());
        responses.extend(hosts.into_iter().map(HostResponse::from));
        Ok(responses)
    }

    /// 确认主机可查询
    pub async fn ensure_known(&self, host: &HostAddr) -> Result<()> {
        if host.is_local() {
            return Ok(());
        }

        HostEntity::find_by_id(host.to_string())
            .one(&self.state.sea_db())
            .await
            .map_err(storage_error)?
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("主机 {} 未注册", host)))
    }

    /// 注销主机，同时删除其全部样本与阈值
    pub async fn remove(&self, host: &HostAddr) -> Result<u64> {
        if host.is_local() {
            return Err(Error::Rejected("本机不能被删除".to_string()));
        }

        let db = &self.state.sea_db();
        let existing = HostEntity::find_by_id(host.to_string())
            .one(db)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| Error::NotFound(format!("主机 {} 未注册", host)))?;

        let txn = db.begin().await.map_err(storage_error)?;
        let removed = purge_host(&txn, host).await.map_err(storage_error)?;
        let host_active: HostActiveModel = existing.into();
        host_active.delete(&txn).await.map_err(storage_error)?;
        txn.commit().await.map_err(storage_error)?;

        info!("注销主机 {}，删除 {} 条样本", host, removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::test_state;
    use crate::collectors::testing::{FakeRuntime, ScriptedHostCollector};
    use std::sync::Arc;

    async fn service() -> HostService {
        HostService::new(test_state(Arc::new(ScriptedHostCollector::default()), FakeRuntime::default()).await)
    }

    fn host(addr: &str) -> HostAddr {
        HostAddr::parse(addr).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let service = service().await;
        service.register(&host("10.0.0.9")).await.unwrap();
        service.register(&host("10.0.0.5")).await.unwrap();

        let hosts = service.list().await.unwrap();
        let addresses: Vec<_> = hosts.iter().map(|h| h.address.as_str()).collect();
        assert_eq!(addresses, vec!["localhost", "10.0.0.5", "10.0.0.9"]);
        assert!(hosts[0].is_local);
    }

    #[tokio::test]
    async fn test_register_duplicates_rejected() {
        let service = service().await;
        service.register(&host("10.0.0.5")).await.unwrap();
        assert!(matches!(
            service.register(&host("10.0.0.5")).await,
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            service.register(&host("127.0.0.1")).await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_register_reports_conflict() {
        let service = service().await;
        let other = HostService::new(service.state.clone());
        let addr = host("10.0.0.5");

        let (first, second) = tokio::join!(service.register(&addr), other.register(&addr));
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::AlreadyExists(_)))));
        assert_eq!(service.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_known() {
        let service = service().await;
        service.ensure_known(&HostAddr::local()).await.unwrap();
        assert!(matches!(
            service.ensure_known(&host("10.0.0.5")).await,
            Err(Error::NotFound(_))
        ));
        service.register(&host("10.0.0.5")).await.unwrap();
        service.ensure_known(&host("10.0.0.5")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_local_host_is_rejected() {
        let service = service().await;
        assert!(matches!(
            service.remove(&host("localhost")).await,
            Err(Error::Rejected(_))
        ));
        assert!(matches!(
            service.remove(&host("::1")).await,
            Err(Error::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_unknown_and_registered() {
        let service = service().await;
        assert!(matches!(
            service.remove(&host("10.0.0.5")).await,
            Err(Error::NotFound(_))
        ));

        service.register(&host("10.0.0.5")).await.unwrap();
        service.remove(&host("10.0.0.5")).await.unwrap();
        assert!(matches!(
            service.ensure_known(&host("10.0.0.5")).await,
            Err(Error::NotFound(_))
        ));
    }
}

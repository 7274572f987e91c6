use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{DatastoreBackend, DatastoreConfig};
use crate::errors::{FunnelError, Result};

pub mod backend;
pub mod models;

pub use backend::{PostgrestStore, SqlStore};
pub use models::{
    CodeInputEvent, CodeKeyed, CodeOpen, ContactRecord, ContactTable, FieldsFilledSnapshot,
    RawSubmission, RowId, Table, Timestamped,
};

/// 只读数据源
///
/// 每个方法对应一次完整的表读取；事件表按各自时间戳倒序返回。
/// 实现必须是无状态的，同一个实例会被所有请求并发使用。
#[async_trait]
pub trait FunnelStore: Send + Sync {
    async fn contacts(&self, table: ContactTable) -> Result<Vec<ContactRecord>>;

    async fn code_opens(&self) -> Result<Vec<CodeOpen>>;

    async fn input_events(&self) -> Result<Vec<CodeInputEvent>>;

    async fn fields_filled(&self) -> Result<Vec<FieldsFilledSnapshot>>;

    async fn form_submissions(&self) -> Result<Vec<RawSubmission>>;

    fn backend_name(&self) -> &'static str;
}

/// 数据源未配置时使用：进程照常启动，每次读取都返回配置错误
pub struct UnconfiguredStore {
    missing: Vec<&'static str>,
}

impl UnconfiguredStore {
    pub fn new(missing: Vec<&'static str>) -> Self {
        Self { missing }
    }

    fn error(&self) -> FunnelError {
        FunnelError::datastore_config(format!(
            "Datastore is not configured (missing: {})",
            self.missing.join(", ")
        ))
    }
}

#[async_trait]
impl FunnelStore for UnconfiguredStore {
    async fn contacts(&self, _table: ContactTable) -> Result<Vec<ContactRecord>> {
        Err(self.error())
    }

    async fn code_opens(&self) -> Result<Vec<CodeOpen>> {
        Err(self.error())
    }

    async fn input_events(&self) -> Result<Vec<CodeInputEvent>> {
        Err(self.error())
    }

    async fn fields_filled(&self) -> Result<Vec<FieldsFilledSnapshot>> {
        Err(self.error())
    }

    async fn form_submissions(&self) -> Result<Vec<RawSubmission>> {
        Err(self.error())
    }

    fn backend_name(&self) -> &'static str {
        "unconfigured"
    }
}

pub struct StoreFactory;

impl StoreFactory {
    /// 按配置创建数据源
    ///
    /// 缺少 url / key 时不会失败，而是返回 [`UnconfiguredStore`]；
    /// SQL 后端连接失败会直接返回错误。
    pub async fn create(config: &DatastoreConfig) -> Result<Arc<dyn FunnelStore>> {
        let missing = config.missing_settings();
        if !missing.is_empty() {
            warn!(
                "Datastore settings missing: {}. Every read will fail until configured.",
                missing.join(", ")
            );
            return Ok(Arc::new(UnconfiguredStore::new(missing)));
        }

        let store: Arc<dyn FunnelStore> = match config.backend {
            DatastoreBackend::Postgrest => Arc::new(PostgrestStore::new(config)?),
            DatastoreBackend::Sql => Arc::new(SqlStore::connect(&config.url, config).await?),
        };

        info!("Datastore backend initialized: {}", store.backend_name());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_store_fails_every_read() {
        let store = StoreFactory::create(&DatastoreConfig::default())
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "unconfigured");

        let err = store.code_opens().await.unwrap_err();
        assert!(matches!(err, FunnelError::DatastoreConfig(_)));
        assert!(err.message().contains("datastore.url"));
        assert!(store.contacts(ContactTable::Referral).await.is_err());
    }

    #[tokio::test]
    async fn test_factory_builds_postgrest_store() {
        let cfg = DatastoreConfig {
            url: "https://demo.supabase.co".to_string(),
            service_key: "key".to_string(),
            ..Default::default()
        };
        let store = StoreFactory::create(&cfg).await.unwrap();
        assert_eq!(store.backend_name(), "postgrest");
    }
}

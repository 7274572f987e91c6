//! PostgREST 后端
//!
//! ureq 是同步客户端，所有请求都放到 `spawn_blocking` 中执行。
//! 每张表按 `page_size` 分页读取，直到某页不足一整页。

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error, trace};
use ureq::Agent;
use url::Url;

use crate::config::DatastoreConfig;
use crate::errors::{FunnelError, Result};
use crate::storage::FunnelStore;
use crate::storage::models::{
    CodeInputEvent, CodeOpen, ContactRecord, ContactTable, FieldsFilledSnapshot, RawSubmission,
    Table,
};

/// 单页响应体上限
const MAX_PAGE_BYTES: u64 = 64 * 1024 * 1024;

pub struct PostgrestStore {
    agent: Agent,
    base: Url,
    service_key: String,
    page_size: usize,
}

impl PostgrestStore {
    pub fn new(config: &DatastoreConfig) -> Result<Self> {
        let base = rest_base(&config.url)?;

        if config.service_key.trim().is_empty() {
            return Err(FunnelError::datastore_config(
                "datastore.service_key is empty",
            ));
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            // 非 2xx 响应体中带有错误信息，需要自行解析
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            base,
            service_key: config.service_key.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// 读取整张表（异步包装）
    async fn fetch<T>(&self, table: Table) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = TableRequest {
            agent: self.agent.clone(),
            endpoint: self.table_url(table)?,
            service_key: self.service_key.clone(),
            page_size: self.page_size,
            table,
        };

        let rows = tokio::task::spawn_blocking(move || request.fetch_all_sync())
            .await
            .map_err(|e| FunnelError::internal(format!("Datastore read task failed: {}", e)))?;

        if let Err(e) = &rows {
            error!("Failed to read table {}: {}", table, e);
        }
        rows
    }

    fn table_url(&self, table: Table) -> Result<Url> {
        self.base.join(table.name()).map_err(|e| {
            FunnelError::datastore_config(format!("Invalid table URL for {}: {}", table, e))
        })
    }
}

/// `https://xyz.supabase.co` -> `https://xyz.supabase.co/rest/v1/`
fn rest_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let base = Url::parse(&format!("{}/rest/v1/", trimmed))
        .map_err(|e| FunnelError::datastore_config(format!("Invalid datastore.url '{}': {}", raw, e)))?;

    match base.scheme() {
        "http" | "https" => Ok(base),
        other => Err(FunnelError::datastore_config(format!(
            "datastore.url must be http(s) for the postgrest backend, got '{}'",
            other
        ))),
    }
}

/// 一次表读取所需的全部参数，可整体移入阻塞线程
struct TableRequest {
    agent: Agent,
    endpoint: Url,
    service_key: String,
    page_size: usize,
    table: Table,
}

impl TableRequest {
    fn page_url(&self, offset: usize) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", self.table.columns());
            query.append_pair("order", self.table.page_order());
            query.append_pair("limit", &self.page_size.to_string());
            query.append_pair("offset", &offset.to_string());
        }
        url
    }

    fn fetch_all_sync<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page: Vec<T> = self.fetch_page_sync(offset)?;
            let fetched = page.len();
            rows.extend(page);
            trace!("{}: fetched {} rows at offset {}", self.table, fetched, offset);

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        debug!("{}: {} rows total", self.table, rows.len());
        Ok(rows)
    }

    fn fetch_page_sync<T: DeserializeOwned>(&self, offset: usize) -> Result<Vec<T>> {
        let url = self.page_url(offset);

        let resp = self
            .agent
            .get(url.as_str())
            .header("apikey", &self.service_key)
            .header("Authorization", &format!("Bearer {}", self.service_key))
            .header("Accept", "application/json")
            .call()
            .map_err(|e| {
                FunnelError::datastore_connection(format!(
                    "Request to {} failed: {}",
                    self.table, e
                ))
            })?;

        let status = resp.status();
        let mut body = resp.into_body();

        if !status.is_success() {
            let text = body
                .with_config()
                .limit(MAX_PAGE_BYTES)
                .read_to_string()
                .unwrap_or_default();
            return Err(FunnelError::datastore_query(format!(
                "{} ({}): {}",
                self.table,
                status.as_u16(),
                error_message(&text)
            )));
        }

        body.with_config()
            .limit(MAX_PAGE_BYTES)
            .read_json::<Vec<T>>()
            .map_err(|e| {
                FunnelError::serialization(format!("Unexpected {} payload: {}", self.table, e))
            })
    }
}

/// 从 PostgREST 错误体中取出 `message`，取不到时返回原文
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "empty response".to_string()
            } else {
                body.to_string()
            }
        })
}

#[async_trait]
impl FunnelStore for PostgrestStore {
    async fn contacts(&self, table: ContactTable) -> Result<Vec<ContactRecord>> {
        self.fetch(table.table()).await
    }

    async fn code_opens(&self) -> Result<Vec<CodeOpen>> {
        self.fetch(Table::CodeOpens).await
    }

    async fn input_events(&self) -> Result<Vec<CodeInputEvent>> {
        self.fetch(Table::CodeInputEvents).await
    }

    async fn fields_filled(&self) -> Result<Vec<FieldsFilledSnapshot>> {
        self.fetch(Table::CodeAllFieldsFilled).await
    }

    async fn form_submissions(&self) -> Result<Vec<RawSubmission>> {
        self.fetch(Table::FormSubmissions).await
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }
}

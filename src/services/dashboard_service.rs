//! Dashboard service layer
//!
//! Owns the read orchestration for every HTTP route and the CLI report:
//! issue the fixed set of independent reads concurrently, then hand the
//! results to the pure functions in `enrichment`, `funnel` and `dashboard`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::{join, join4, try_join3};
use tracing::{debug, warn};

use super::dashboard::{
    DashboardSettings, DashboardSnapshot, DashboardView, Dataset, build_dashboard,
};
use super::enrichment::{
    ContactDirectory, Enriched, EnrichedSubmission, enrich_rows, enrich_submissions,
};
use super::filter::{DashboardFilter, DashboardQuery};
use super::funnel::{AnalyticsSummary, analytics_summary};
use crate::errors::Result;
use crate::storage::{
    CodeInputEvent, CodeOpen, ContactRecord, ContactTable, FieldsFilledSnapshot, FunnelStore,
};

pub struct DashboardService {
    store: Arc<dyn FunnelStore>,
    settings: DashboardSettings,
}

impl DashboardService {
    pub fn new(store: Arc<dyn FunnelStore>, settings: DashboardSettings) -> Self {
        Self { store, settings }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub async fn contacts(&self, table: ContactTable) -> Result<Vec<ContactRecord>> {
        self.store.contacts(table).await
    }

    /// 读取两张联系人表并构建目录；读取失败按空表处理
    async fn directory(&self) -> ContactDirectory {
        let (discounts, referrals) = join(
            self.store.contacts(ContactTable::Discount),
            self.store.contacts(ContactTable::Referral),
        )
        .await;

        let or_empty = |result: Result<Vec<ContactRecord>>, table: &str| {
            result.unwrap_or_else(|e| {
                warn!("Reference table {} unavailable, treated as empty: {}", table, e);
                Vec::new()
            })
        };

        ContactDirectory::build(
            &or_empty(discounts, "discount"),
            &or_empty(referrals, "referral"),
        )
    }

    pub async fn code_opens(&self) -> Result<Vec<Enriched<CodeOpen>>> {
        let (rows, directory) = join(self.store.code_opens(), self.directory()).await;
        Ok(enrich_rows(rows?, &directory))
    }

    pub async fn input_events(&self) -> Result<Vec<Enriched<CodeInputEvent>>> {
        let (rows, directory) = join(self.store.input_events(), self.directory()).await;
        Ok(enrich_rows(rows?, &directory))
    }

    pub async fn fields_filled(&self) -> Result<Vec<Enriched<FieldsFilledSnapshot>>> {
        let (rows, directory) = join(self.store.fields_filled(), self.directory()).await;
        Ok(enrich_rows(rows?, &directory))
    }

    pub async fn form_submissions(&self) -> Result<Vec<EnrichedSubmission>> {
        let (rows, directory) = join(self.store.form_submissions(), self.directory()).await;
        Ok(enrich_submissions(rows?, &directory))
    }

    /// totals + conversions；任一读取失败则整体失败
    pub async fn analytics(&self) -> Result<AnalyticsSummary> {
        let (discounts, referrals, opens) = try_join3(
            self.store.contacts(ContactTable::Discount),
            self.store.contacts(ContactTable::Referral),
            self.store.code_opens(),
        )
        .await?;

        Ok(analytics_summary(&discounts, &referrals, &opens))
    }

    /// 并发读取六个数据集，互不影响
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let ((discounts, referrals), (opens, input_events, fields_filled, submissions)) = join(
            join(
                self.store.contacts(ContactTable::Discount),
                self.store.contacts(ContactTable::Referral),
            ),
            join4(
                self.store.code_opens(),
                self.store.input_events(),
                self.store.fields_filled(),
                self.store.form_submissions(),
            ),
        )
        .await;

        let snapshot = DashboardSnapshot {
            discounts: Dataset::from_result(discounts),
            referrals: Dataset::from_result(referrals),
            opens: Dataset::from_result(opens),
            input_events: Dataset::from_result(input_events),
            fields_filled: Dataset::from_result(fields_filled),
            submissions: Dataset::from_result(submissions),
        };

        debug!(
            "Dashboard snapshot: {} opens, {} input events, {} fills, {} submissions",
            snapshot.opens.rows.len(),
            snapshot.input_events.rows.len(),
            snapshot.fields_filled.rows.len(),
            snapshot.submissions.rows.len()
        );
        snapshot
    }

    /// 过滤参数无效时返回 DateParse 错误，读取失败体现在各数据集的 error 上
    pub async fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardView> {
        self.dashboard_at(query, Utc::now()).await
    }

    pub async fn dashboard_at(
        &self,
        query: &DashboardQuery,
        now: DateTime<Utc>,
    ) -> Result<DashboardView> {
        let filter = DashboardFilter::from_query(query, self.settings.offset)?;
        let snapshot = self.snapshot().await;
        Ok(build_dashboard(
            &snapshot,
            query,
            &filter,
            &self.settings,
            now,
        ))
    }
}

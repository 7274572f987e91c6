//! 集成测试共用的内存数据源与构造函数

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use funnelboard::errors::{FunnelError, Result};
use funnelboard::services::{DashboardService, DashboardSettings};
use funnelboard::storage::{
    CodeInputEvent, CodeOpen, ContactRecord, ContactTable, FieldsFilledSnapshot, FunnelStore,
    RawSubmission, RowId, Table,
};

/// 内存数据源；`failing` 中的表每次读取都返回查询错误
#[derive(Default, Clone)]
pub struct MemoryStore {
    pub discounts: Vec<ContactRecord>,
    pub referrals: Vec<ContactRecord>,
    pub opens: Vec<CodeOpen>,
    pub input_events: Vec<CodeInputEvent>,
    pub fields_filled: Vec<FieldsFilledSnapshot>,
    pub submissions: Vec<RawSubmission>,
    pub failing: HashSet<Table>,
}

impl MemoryStore {
    pub fn failing(mut self, table: Table) -> Self {
        self.failing.insert(table);
        self
    }

    fn read<T: Clone>(&self, table: Table, rows: &[T]) -> Result<Vec<T>> {
        if self.failing.contains(&table) {
            return Err(FunnelError::datastore_query(format!(
                "relation \"{}\" does not exist",
                table
            )));
        }
        Ok(rows.to_vec())
    }
}

#[async_trait]
impl FunnelStore for MemoryStore {
    async fn contacts(&self, table: ContactTable) -> Result<Vec<ContactRecord>> {
        match table {
            ContactTable::Discount => self.read(Table::Discount, &self.discounts),
            ContactTable::Referral => self.read(Table::Referral, &self.referrals),
        }
    }

    async fn code_opens(&self) -> Result<Vec<CodeOpen>> {
        self.read(Table::CodeOpens, &self.opens)
    }

    async fn input_events(&self) -> Result<Vec<CodeInputEvent>> {
        self.read(Table::CodeInputEvents, &self.input_events)
    }

    async fn fields_filled(&self) -> Result<Vec<FieldsFilledSnapshot>> {
        self.read(Table::CodeAllFieldsFilled, &self.fields_filled)
    }

    async fn form_submissions(&self) -> Result<Vec<RawSubmission>> {
        self.read(Table::FormSubmissions, &self.submissions)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

pub fn service(store: MemoryStore) -> DashboardService {
    DashboardService::new(Arc::new(store), DashboardSettings::default())
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn contact(code: &str, name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> ContactRecord {
    ContactRecord {
        code: code.to_string(),
        name: name.map(String::from),
        email: email.map(String::from),
        phone: phone.map(String::from),
    }
}

pub fn open(code: &str, opened_at: DateTime<Utc>) -> CodeOpen {
    CodeOpen {
        code: code.to_string(),
        opened_at,
    }
}

pub fn input_event(id: i64, code: &str, field: &str, value: &str, changed_at: DateTime<Utc>) -> CodeInputEvent {
    CodeInputEvent {
        id: RowId::Int(id),
        code: code.to_string(),
        field_name: field.to_string(),
        input_value: Some(value.to_string()),
        changed_at,
    }
}

pub fn filled(id: i64, code: &str, filled_at: DateTime<Utc>) -> FieldsFilledSnapshot {
    FieldsFilledSnapshot {
        id: RowId::Int(id),
        code: code.to_string(),
        filled_at,
        field_snapshot: Value::Null,
    }
}

pub fn submission(id: i64, code: &str, submitted_at: DateTime<Utc>) -> RawSubmission {
    RawSubmission {
        id: RowId::Int(id),
        code: code.to_string(),
        submitted_at,
        submission_snapshot: None,
        name: None,
        email: None,
        phone: None,
        from_zip: None,
        to_zip: None,
        move_date: None,
        move_size: None,
        has_discount: None,
    }
}

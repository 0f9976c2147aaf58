// crates/db/src/memory.rs
//! In-process data source with PostgREST filter semantics.
//!
//! Used by tests and by `--demo` mode. Every executed query is logged so
//! tests can assert on what was asked of the backend.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use crysta_view_core::transform::parse_timestamp;
use crysta_view_core::{ChatHistory, Lead};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::{Filter, Query, Table};
use crate::source::{DataSource, QueryResponse};
use crate::{DbError, DbResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    executed: Mutex<Vec<Query>>,
    failing: Mutex<HashSet<Table>>,
    failing_text_search: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_rows(&self, table: Table, rows: impl IntoIterator<Item = Value>) {
        lock(&self.tables).entry(table).or_default().extend(rows);
    }

    pub fn insert_leads(&self, leads: &[Lead]) {
        self.insert_rows(Table::Users, leads.iter().filter_map(to_row));
    }

    pub fn insert_chats(&self, chats: &[ChatHistory]) {
        self.insert_rows(Table::ChatHistories, chats.iter().filter_map(to_row));
    }

    pub fn row_count(&self, table: Table) -> usize {
        lock(&self.tables).get(&table).map_or(0, Vec::len)
    }

    /// Make every query against `table` fail until `heal_table` is called.
    pub fn fail_table(&self, table: Table) {
        lock(&self.failing).insert(table);
    }

    pub fn heal_table(&self, table: Table) {
        lock(&self.failing).remove(&table);
    }

    /// Make every query carrying a full-text search filter fail, whatever
    /// its table, until `heal_text_search` is called.
    pub fn fail_text_search(&self) {
        self.failing_text_search.store(true, AtomicOrdering::SeqCst);
    }

    pub fn heal_text_search(&self) {
        self.failing_text_search.store(false, AtomicOrdering::SeqCst);
    }

    /// Queries executed so far, oldest first.
    pub fn executed(&self) -> Vec<Query> {
        lock(&self.executed).clone()
    }

    pub fn executed_against(&self, table: Table) -> usize {
        lock(&self.executed).iter().filter(|q| q.table == table).count()
    }

    pub fn clear_log(&self) {
        lock(&self.executed).clear();
    }

    fn run(&self, query: &Query) -> DbResult<QueryResponse> {
        if lock(&self.failing).contains(&query.table) {
            return Err(DbError::Remote {
                status: 503,
                code: None,
                message: format!("{} is unavailable", query.table),
            });
        }
        if self.failing_text_search.load(AtomicOrdering::SeqCst)
            && query.filters.iter().any(|f| matches!(f, Filter::TextSearch { .. }))
        {
            return Err(DbError::Remote {
                status: 400,
                code: Some("42601".to_string()),
                message: "syntax error in tsquery".to_string(),
            });
        }

        let tables = lock(&self.tables);
        let mut rows: Vec<&Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches_all(row, &query.filters)).collect())
            .unwrap_or_default();
        let count = query.count.map(|_| rows.len() as u64);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        if query.is_head() {
            return Ok(QueryResponse {
                rows: Vec::new(),
                count,
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, &query.columns))
            .collect();
        Ok(QueryResponse { rows, count })
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    async fn execute(&self, query: &Query) -> DbResult<QueryResponse> {
        lock(&self.executed).push(query.clone());
        self.run(query)
    }
}

fn to_row<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

/// Text form of a column, `None` for null or missing.
fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => column_text(row, column).as_deref() == Some(value.as_str()),
        Filter::IlikeAny { columns, term } => {
            let needle = term.to_lowercase();
            columns.iter().any(|c| {
                column_text(row, c).is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        Filter::In { column, values } => {
            column_text(row, column).is_some_and(|text| values.iter().any(|v| *v == text))
        }
        Filter::Gte { column, value } => column_text(row, column)
            .is_some_and(|text| compare_text(&text, value) != Ordering::Less),
        Filter::Lte { column, value } => column_text(row, column)
            .is_some_and(|text| compare_text(&text, value) != Ordering::Greater),
        Filter::NotNull { column } => column_text(row, column).is_some(),
        Filter::TextSearch { column, term } => {
            let Some(text) = column_text(row, column) else {
                return false;
            };
            let text = text.to_lowercase();
            let mut words = term.split_whitespace().peekable();
            words.peek().is_some() && words.all(|w| text.contains(&w.to_lowercase()))
        }
    }
}

/// Compare as timestamps when both sides parse, then as numbers, then as
/// strings.
fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (parse_timestamp(a), parse_timestamp(b)) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.cmp(b)
}

/// Ascending order with nulls last, as Postgres sorts.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => compare_text(x, y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let Some(object) = row.as_object() else {
        return row.clone();
    };
    let picked: Map<String, Value> = columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| object.get(c).map(|v| (c.to_string(), v.clone())))
        .collect();
    Value::Object(picked)
}

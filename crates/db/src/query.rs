// crates/db/src/query.rs
//! PostgREST query builder.
//!
//! A `Query` is a plain value: table, column selection, AND-ed filters,
//! ordering and paging. `to_params()` renders it as PostgREST URL
//! parameters; the in-memory store interprets the same value directly.

/// Tables exposed by the hosted backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    ChatHistories,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::ChatHistories => "n8n_chat_histories",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Row counting requested alongside the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Exact count plus rows.
    Exact,
    /// Exact count only, no rows (HTTP `HEAD`).
    ExactHead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    /// Case-insensitive substring match on any of the columns.
    IlikeAny { columns: Vec<String>, term: String },
    In { column: String, values: Vec<String> },
    Gte { column: String, value: String },
    Lte { column: String, value: String },
    NotNull { column: String },
    /// Plain full-text search: every word of `term` must appear.
    TextSearch { column: String, term: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: Table,
    pub columns: String,
    pub count: Option<CountMode>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl From<Table> for Query {
    fn from(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            count: None,
            filters: Vec::new(),
            order: None,
            offset: None,
            limit: None,
        }
    }
}

impl Query {
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn count(mut self, mode: CountMode) -> Self {
        self.count = Some(mode);
        self
    }

    pub fn is_head(&self) -> bool {
        self.count == Some(CountMode::ExactHead)
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn ilike_any(mut self, columns: &[&str], term: impl Into<String>) -> Self {
        self.filters.push(Filter::IlikeAny {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.into(),
        });
        self
    }

    pub fn in_list<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Gte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Lte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull {
            column: column.to_string(),
        });
        self
    }

    pub fn text_search(mut self, column: &str, term: impl Into<String>) -> Self {
        self.filters.push(Filter::TextSearch {
            column: column.to_string(),
            term: term.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    /// Inclusive row range, as in PostgREST's `Range` header.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Render as PostgREST URL parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];

        for filter in &self.filters {
            params.push(match filter {
                Filter::Eq { column, value } => (column.clone(), format!("eq.{value}")),
                Filter::IlikeAny { columns, term } => {
                    let pattern = quote(&format!("*{term}*"));
                    let parts: Vec<String> = columns
                        .iter()
                        .map(|c| format!("{c}.ilike.{pattern}"))
                        .collect();
                    ("or".to_string(), format!("({})", parts.join(",")))
                }
                Filter::In { column, values } => {
                    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
                    (column.clone(), format!("in.({})", quoted.join(",")))
                }
                Filter::Gte { column, value } => (column.clone(), format!("gte.{value}")),
                Filter::Lte { column, value } => (column.clone(), format!("lte.{value}")),
                Filter::NotNull { column } => (column.clone(), "not.is.null".to_string()),
                Filter::TextSearch { column, term } => (column.clone(), format!("plfts.{term}")),
            });
        }

        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{dir}", order.column)));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Double-quote a value for use inside `or=(...)` or `in.(...)`.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_defaults_select_all() {
        let q = Query::from(Table::Users);
        assert_eq!(q.to_params(), vec![p("select", "*")]);
    }

    #[test]
    fn test_full_render() {
        let q = Query::from(Table::Users)
            .select("phone_number, full_name")
            .count(CountMode::Exact)
            .eq("lead_status", "converted")
            .ilike_any(&["phone_number", "full_name"], "ray")
            .gte("created_at", "2024-01-01")
            .not_null("user_city")
            .order("updated_at", false)
            .range(50, 99);
        assert_eq!(
            q.to_params(),
            vec![
                p("select", "phone_number, full_name"),
                p("lead_status", "eq.converted"),
                p("or", r#"(phone_number.ilike."*ray*",full_name.ilike."*ray*")"#),
                p("created_at", "gte.2024-01-01"),
                p("user_city", "not.is.null"),
                p("order", "updated_at.desc"),
                p("offset", "50"),
                p("limit", "50"),
            ]
        );
    }

    #[test]
    fn test_in_list_quotes_and_escapes() {
        let q = Query::from(Table::ChatHistories).in_list("session_id", ["91,1", "a\"b"]);
        assert_eq!(q.to_params()[1], p("session_id", r#"in.("91,1","a\"b")"#));
    }

    #[test]
    fn test_text_search_and_limit() {
        let q = Query::from(Table::ChatHistories)
            .select("session_id")
            .text_search("message", "embryo transfer")
            .limit(500);
        assert_eq!(
            q.to_params(),
            vec![
                p("select", "session_id"),
                p("message", "plfts.embryo transfer"),
                p("limit", "500"),
            ]
        );
    }

    #[test]
    fn test_head_count() {
        let q = Query::from(Table::Users).count(CountMode::ExactHead);
        assert!(q.is_head());
        assert_eq!(Table::ChatHistories.to_string(), "n8n_chat_histories");
    }
}

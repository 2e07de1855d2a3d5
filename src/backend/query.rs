//! Table query builder
//!
//! A `Query` names a table, the selected columns and a list of filters.
//! It renders to PostgREST query parameters (`select=*`, `column=op.value`)
//! for the REST backend and is evaluated directly by the memory backend.

use std::fmt;

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
    /// Case-insensitive pattern match with `%` and `_` wildcards
    ILike,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::ILike => "ilike",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    /// PostgREST parameter value, e.g. `eq.completed`
    pub fn param_value(&self) -> String {
        format!("{}.{}", self.op, self.value)
    }
}

/// A query against one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    columns: String,
    filters: Vec<Filter>,
}

impl Query {
    /// Query every column of `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
        }
    }

    /// Columns to return, in PostgREST select syntax (e.g. `*,user:users(*)`)
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn ilike(self, column: impl Into<String>, pattern: impl ToString) -> Self {
        self.filter(column, FilterOp::ILike, pattern)
    }

    fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &str {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Query parameters for a read (select plus filters)
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filter_params());
        params
    }

    /// Query parameters for a write (filters only)
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| (f.column.clone(), f.param_value()))
            .collect()
    }
}

use chrono::NaiveDate;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

/// ===============================
/// WHERE clause container
/// ===============================
#[derive(Debug, Default)]
pub struct SqlWhere {
    conditions: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl SqlWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = ?`
    pub fn and_eq(&mut self, column: &str, value: SqlValue) -> &mut Self {
        self.conditions.push(format!("{} = ?", column));
        self.values.push(value);
        self
    }

    /// `column BETWEEN ? AND ?`
    pub fn and_between(&mut self, column: &str, from: SqlValue, to: SqlValue) -> &mut Self {
        self.conditions.push(format!("{} BETWEEN ? AND ?", column));
        self.values.push(from);
        self.values.push(to);
        self
    }

    /// `(CAST(c1 AS CHAR) LIKE ? OR ...)`, matching `term` anywhere.
    pub fn and_any_like<'a, I>(&mut self, columns: I, term: &str) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pattern = format!("%{}%", escape_like(term));
        let parts: Vec<String> = columns
            .into_iter()
            .map(|c| {
                self.values.push(SqlValue::String(pattern.clone()));
                format!("CAST({} AS CHAR) LIKE ?", c)
            })
            .collect();

        if !parts.is_empty() {
            self.conditions.push(format!("({})", parts.join(" OR ")));
        }
        self
    }

    /// `column IN (?, ?, ...)`
    pub fn and_in(&mut self, column: &str, values: impl IntoIterator<Item = SqlValue>) -> &mut Self {
        let before = self.values.len();
        self.values.extend(values);
        let placeholders = vec!["?"; self.values.len() - before].join(", ");
        self.conditions.push(format!("{} IN ({})", column, placeholders));
        self
    }

    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// ===============================
/// Bind helpers
/// ===============================
pub fn bind_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
        };
    }
    query
}

pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_where_clause_in_bind_order() {
        let mut w = SqlWhere::new();
        w.and_eq("a.worker_id", SqlValue::U64(7)).and_between(
            "a.date",
            SqlValue::String("2024-01-01".into()),
            SqlValue::String("2024-01-31".into()),
        );
        w.and_any_like(["u.name", "a.date"], "50%");

        assert_eq!(
            w.to_sql(),
            " WHERE a.worker_id = ? AND a.date BETWEEN ? AND ? AND \
             (CAST(u.name AS CHAR) LIKE ? OR CAST(a.date AS CHAR) LIKE ?)"
        );
        assert_eq!(w.values.len(), 5);
        assert_eq!(w.values[3], SqlValue::String("%50\\%%".into()));
    }

    #[test]
    fn empty_where_and_in_list() {
        assert_eq!(SqlWhere::new().to_sql(), "");

        let mut w = SqlWhere::new();
        w.and_in("su.user_id", [SqlValue::U64(1), SqlValue::U64(2)]);
        assert_eq!(w.to_sql(), " WHERE su.user_id IN (?, ?)");
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like(r"a_b%c\d"), r"a\_b\%c\\d");
    }
}

//! WHERE fragments with their own bind parameters.
//!
//! A [`ConditionBuilder`] is owned by exactly one SELECT, UPDATE or DELETE
//! builder at a time. Its params are kept apart from the owning builder's
//! params and only appended after them when the statement runs.
//!
//! # Example
//! ```
//! use mdborm::{ConditionBuilder, Value};
//!
//! let mut cond = ConditionBuilder::new();
//! cond.and_where("m.id", vec![1, 2, 3]).or_where("m.deleted", false);
//!
//! assert_eq!(cond.to_sql(), " WHERE `m`.`id` IN (?, ?, ?) OR `m`.`deleted` = ?");
//! assert_eq!(cond.params().types(), "dddi");
//! assert_eq!(cond.params().values()[3], Value::Int(0));
//! ```

use crate::ident::quote_field;
use crate::param::Params;
use crate::value::{ToValue, Value};

/// How a predicate attaches to the ones before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

/// Accumulated WHERE predicates.
#[derive(Debug, Clone, Default)]
pub struct ConditionBuilder {
    /// Predicate text without the leading `WHERE`.
    sql: String,
    params: Params,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder holding a single `field = ?` (or `field IN (...)`) predicate.
    pub fn with<V: ToValue>(field: &str, value: V) -> Self {
        let mut builder = Self::new();
        builder.and_where(field, value);
        builder
    }

    /// Append a predicate.
    ///
    /// A list value defaults to `IN` with one placeholder per element, any
    /// other value to `=`. An empty list renders `1=0` for `IN` and `1=1` for
    /// `NOT IN`, binding nothing.
    ///
    /// `operator` is written into the statement as given.
    pub fn push<V: ToValue>(
        &mut self,
        field: &str,
        value: V,
        operator: Option<&str>,
        conjunction: Conjunction,
    ) -> &mut Self {
        let column = quote_field(field);
        let predicate = match value.to_param() {
            Value::List(items) => {
                let op = operator.unwrap_or("IN");
                if items.is_empty() {
                    if op.trim().eq_ignore_ascii_case("NOT IN") {
                        "1=1".to_string()
                    } else {
                        "1=0".to_string()
                    }
                } else {
                    let placeholders: Vec<&str> =
                        items.into_iter().map(|item| self.params.bind(item)).collect();
                    format!("{column} {op} ({})", placeholders.join(", "))
                }
            }
            scalar => {
                let op = operator.unwrap_or("=");
                let placeholder = self.params.bind(scalar);
                format!("{column} {op} {placeholder}")
            }
        };
        self.append(&predicate, conjunction);
        self
    }

    /// `AND field = ?` (or `IN` for lists).
    pub fn and_where<V: ToValue>(&mut self, field: &str, value: V) -> &mut Self {
        self.push(field, value, None, Conjunction::And)
    }

    /// `OR field = ?` (or `IN` for lists).
    pub fn or_where<V: ToValue>(&mut self, field: &str, value: V) -> &mut Self {
        self.push(field, value, None, Conjunction::Or)
    }

    /// `AND field <op> ?`, e.g. `and_where_op("year", ">=", 1990)`.
    pub fn and_where_op<V: ToValue>(&mut self, field: &str, op: &str, value: V) -> &mut Self {
        self.push(field, value, Some(op), Conjunction::And)
    }

    pub fn or_where_op<V: ToValue>(&mut self, field: &str, op: &str, value: V) -> &mut Self {
        self.push(field, value, Some(op), Conjunction::Or)
    }

    pub fn and_is_null(&mut self, field: &str) -> &mut Self {
        self.append(&format!("{} IS NULL", quote_field(field)), Conjunction::And);
        self
    }

    pub fn and_is_not_null(&mut self, field: &str) -> &mut Self {
        self.append(&format!("{} IS NOT NULL", quote_field(field)), Conjunction::And);
        self
    }

    /// Replace everything with a raw predicate and its pre-classified params.
    ///
    /// The snippet is not checked: it must contain exactly one placeholder per
    /// value and must not include the `WHERE` keyword.
    ///
    /// # Panics
    ///
    /// When `types` and `values` differ in length.
    pub fn custom(&mut self, snippet: &str, types: &str, values: Vec<Value>) -> &mut Self {
        let mut params = Params::new();
        params.push_raw(types, values);
        self.sql = snippet.to_string();
        self.params = params;
        self
    }

    /// The fragment with its leading `" WHERE "`, or an empty string.
    pub fn to_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    fn append(&mut self, predicate: &str, conjunction: Conjunction) {
        if !self.sql.is_empty() {
            self.sql.push_str(conjunction.as_sql());
        }
        self.sql.push_str(predicate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_nothing() {
        let cond = ConditionBuilder::new();
        assert!(cond.is_empty());
        assert_eq!(cond.to_sql(), "");
        assert!(cond.params().is_empty());
    }

    #[test]
    fn first_predicate_gets_where() {
        let cond = ConditionBuilder::with("id", 7);
        assert_eq!(cond.to_sql(), " WHERE `id` = ?");
        assert_eq!(cond.params().types(), "d");
        assert_eq!(cond.params().values(), &[Value::Int(7)]);
    }

    #[test]
    fn conjunctions_chain() {
        let mut cond = ConditionBuilder::new();
        cond.and_where("a", 1)
            .or_where("b", "x")
            .and_where_op("c", ">=", 2.5);
        assert_eq!(cond.to_sql(), " WHERE `a` = ? OR `b` = ? AND `c` >= ?");
        assert_eq!(cond.params().types(), "dsd");
    }

    #[test]
    fn list_defaults_to_in() {
        let cond = ConditionBuilder::with("m.id", [4, 5]);
        assert_eq!(cond.to_sql(), " WHERE `m`.`id` IN (?, ?)");
        assert_eq!(cond.params().values(), &[Value::Int(4), Value::Int(5)]);
    }

    #[test]
    fn list_with_explicit_operator() {
        let mut cond = ConditionBuilder::new();
        cond.and_where_op("status", "NOT IN", vec!["a", "b"]);
        assert_eq!(cond.to_sql(), " WHERE `status` NOT IN (?, ?)");
    }

    #[test]
    fn empty_lists() {
        let mut cond = ConditionBuilder::new();
        cond.and_where("id", Vec::<i32>::new())
            .and_where_op("id", "NOT IN", Vec::<i32>::new());
        assert_eq!(cond.to_sql(), " WHERE 1=0 AND 1=1");
        assert!(cond.params().is_empty());
    }

    #[test]
    fn null_checks() {
        let mut cond = ConditionBuilder::new();
        cond.and_is_null("deleted_at").and_is_not_null("m.title");
        assert_eq!(
            cond.to_sql(),
            " WHERE `deleted_at` IS NULL AND `m`.`title` IS NOT NULL"
        );
    }

    #[test]
    fn custom_overwrites_state() {
        let mut cond = ConditionBuilder::with("id", 1);
        cond.custom(
            "MATCH(title) AGAINST(?) OR year = ?",
            "sd",
            vec![Value::from("heat"), Value::Int(1995)],
        );
        assert_eq!(cond.to_sql(), " WHERE MATCH(title) AGAINST(?) OR year = ?");
        assert_eq!(cond.params().types(), "sd");
        assert_eq!(cond.params().len(), 2);

        // Further predicates append to the custom snippet.
        cond.and_where("deleted", false);
        assert_eq!(cond.params().types(), "sdi");
    }

    #[test]
    #[should_panic]
    fn custom_rejects_mismatch() {
        ConditionBuilder::new().custom("a = ?", "ss", vec![Value::Int(1)]);
    }
}

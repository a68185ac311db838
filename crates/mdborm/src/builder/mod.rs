//! Statement builders.
//!
//! Every builder owns its SQL fragments and its [`Params`](crate::Params);
//! nothing is shared between instances. Values are always bound, identifiers
//! are quoted with [`quote_field`](crate::ident::quote_field).
//!
//! ## Design
//!
//! - SQL is still explicit (strings), but common patterns are structured.
//! - Safe defaults: DELETE requires WHERE (unless explicitly allowed);
//!   UPDATE requires SET.
//! - Placeholders are positional `?`, bound in emission order.
//! - One statement is prepared per `execute`/`fetch*` call.

/// Condition methods delegating to an owned `Option<ConditionBuilder>` field
/// named `conditions`, created on first use.
macro_rules! condition_methods {
    () => {
        fn conditions_mut(&mut self) -> &mut $crate::condition::ConditionBuilder {
            self.conditions
                .get_or_insert_with($crate::condition::ConditionBuilder::new)
        }

        /// Add AND `field = ?` (`IN (...)` for lists).
        pub fn and_where<V: $crate::value::ToValue>(&mut self, field: &str, value: V) -> &mut Self {
            self.conditions_mut().and_where(field, value);
            self
        }

        /// Add OR `field = ?` (`IN (...)` for lists).
        pub fn or_where<V: $crate::value::ToValue>(&mut self, field: &str, value: V) -> &mut Self {
            self.conditions_mut().or_where(field, value);
            self
        }

        /// Add AND `field <op> ?`.
        pub fn and_where_op<V: $crate::value::ToValue>(
            &mut self,
            field: &str,
            op: &str,
            value: V,
        ) -> &mut Self {
            self.conditions_mut().and_where_op(field, op, value);
            self
        }

        /// Add OR `field <op> ?`.
        pub fn or_where_op<V: $crate::value::ToValue>(
            &mut self,
            field: &str,
            op: &str,
            value: V,
        ) -> &mut Self {
            self.conditions_mut().or_where_op(field, op, value);
            self
        }

        pub fn and_is_null(&mut self, field: &str) -> &mut Self {
            self.conditions_mut().and_is_null(field);
            self
        }

        pub fn and_is_not_null(&mut self, field: &str) -> &mut Self {
            self.conditions_mut().and_is_not_null(field);
            self
        }

        /// Replace all conditions with a raw predicate, see
        /// [`ConditionBuilder::custom`](crate::condition::ConditionBuilder::custom).
        pub fn custom_condition(
            &mut self,
            snippet: &str,
            types: &str,
            values: Vec<$crate::value::Value>,
        ) -> &mut Self {
            self.conditions_mut().custom(snippet, types, values);
            self
        }

        /// Replace the condition builder wholesale.
        pub fn set_conditions(&mut self, conditions: $crate::condition::ConditionBuilder) -> &mut Self {
            self.conditions = Some(conditions);
            self
        }

        /// The attached conditions, if any were added.
        pub fn conditions(&self) -> Option<&$crate::condition::ConditionBuilder> {
            self.conditions.as_ref()
        }

        fn where_sql(&self) -> String {
            self.conditions
                .as_ref()
                .map(|c| c.to_sql())
                .unwrap_or_default()
        }

        #[allow(dead_code)]
        fn has_conditions(&self) -> bool {
            self.conditions.as_ref().is_some_and(|c| !c.is_empty())
        }

        fn params_with_conditions(&self, own: &$crate::param::Params) -> $crate::param::Params {
            match &self.conditions {
                Some(conditions) => own.merged(conditions.params()),
                None => own.clone(),
            }
        }
    };
}

pub mod delete;
pub mod insert;
pub mod select;
pub mod traits;
pub mod update;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::{JoinKind, MAX_ROWS, OrderDirection, SelectBuilder};
pub use traits::{MutationBuilder, SQL_TARGET, SqlBuilder, WriteOutcome};
pub use update::UpdateBuilder;

/// Start an INSERT into `table`.
pub fn insert_into(table: &str) -> InsertBuilder {
    InsertBuilder::insert_into(table)
}

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> UpdateBuilder {
    UpdateBuilder::update(table)
}

/// Start a SELECT from `table`.
pub fn select_from(table: &str) -> SelectBuilder {
    SelectBuilder::from_table(table)
}

/// Start a DELETE from `table`.
pub fn delete_from(table: &str) -> DeleteBuilder {
    DeleteBuilder::delete_from(table)
}

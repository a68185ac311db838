use std::any::Any;
use std::fmt;

use super::traits::{SQL_TARGET, SqlBuilder, close_statement, prepare_bound};
use crate::condition::ConditionBuilder;
use crate::connection::{ColumnMeta, Connection, Statement};
use crate::dynamic::{DEFAULT_DYNAMIC_TYPE, column_get, column_json, decode_json};
use crate::error::{OrmError, OrmResult};
use crate::field::{Composite, FieldDescriptor, FieldOptions, Property};
use crate::ident::{property_name, quote_field};
use crate::param::Params;
use crate::row::{Hydrate, Row, hydrate_row};
use crate::value::Value;

/// Row count meaning "all remaining rows", for offsets without a real limit.
pub const MAX_ROWS: u64 = u64::MAX;

/// Sort direction of an ORDER BY entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Parse `ASC`/`DESC`, ignoring case.
    pub fn parse(direction: &str) -> Option<Self> {
        if direction.eq_ignore_ascii_case("ASC") {
            Some(OrderDirection::Asc)
        } else if direction.eq_ignore_ascii_case("DESC") {
            Some(OrderDirection::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Plain,
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Plain => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
enum JoinConstraint {
    On(String),
    Using(String),
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    constraint: Option<JoinConstraint>,
}

impl Join {
    fn write(&self, sql: &mut String) {
        sql.push(' ');
        sql.push_str(self.kind.keyword());
        sql.push(' ');
        sql.push_str(&quote_field(&self.table));
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&quote_field(alias));
        }
        match &self.constraint {
            Some(JoinConstraint::On(raw)) => {
                sql.push_str(" ON ");
                sql.push_str(raw);
            }
            Some(JoinConstraint::Using(field)) => {
                sql.push_str(" USING (");
                sql.push_str(&quote_field(field));
                sql.push(')');
            }
            None => {}
        }
    }
}

/// SELECT builder with row hydration.
///
/// The projection is a list of [`FieldDescriptor`]s; the result columns are
/// read back in the same order and written into the target's properties.
///
/// ```
/// use mdborm::{FieldOptions, SelectBuilder, SqlBuilder};
///
/// let mut q = SelectBuilder::from_table_as("movies", "m");
/// q.select("m.id")
///     .select_dynamic_char("m.titles", "en", FieldOptions::new().property("title"))
///     .left_join("ratings", Some("r"))
///     .using("movie_id")
///     .and_where("m.deleted", false)
///     .order_by_desc("m.created")
///     .limit(10);
///
/// assert_eq!(
///     q.build_sql(),
///     "SELECT `m`.`id`, COLUMN_GET(`m`.`dyn_titles`, ? AS CHAR(255)) AS `titles` \
///      FROM `movies` AS `m` LEFT JOIN `ratings` AS `r` USING (`movie_id`) \
///      WHERE `m`.`deleted` = ? ORDER BY m.created DESC LIMIT 10"
/// );
/// assert_eq!(q.params().types(), "si");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    table: String,
    alias: Option<String>,
    fields: Vec<FieldDescriptor>,
    composites: Vec<Composite>,
    joins: Vec<Join>,
    conditions: Option<ConditionBuilder>,
    order_by: Vec<(String, OrderDirection)>,
    /// (row count, offset)
    limit: Option<(u64, Option<u64>)>,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder selecting from `table`.
    pub fn from_table(table: &str) -> Self {
        let mut builder = Self::new();
        builder.from(table);
        builder
    }

    /// Create a builder selecting from `table AS alias`.
    pub fn from_table_as(table: &str, alias: &str) -> Self {
        let mut builder = Self::new();
        builder.from_as(table, alias);
        builder
    }

    pub fn from(&mut self, table: &str) -> &mut Self {
        self.table = table.to_string();
        self.alias = None;
        self
    }

    pub fn from_as(&mut self, table: &str, alias: &str) -> &mut Self {
        self.table = table.to_string();
        self.alias = Some(alias.to_string());
        self
    }

    // ==================== Projection ====================

    /// Select a plain field into its camel-cased property (`release_year` → `releaseYear`).
    pub fn select(&mut self, field: &str) -> &mut Self {
        self.select_with(field, FieldOptions::new())
    }

    pub fn select_with(&mut self, field: &str, options: FieldOptions) -> &mut Self {
        self.push_field(field, quote_field(field), None, options, Params::new())
    }

    /// Select a raw expression aliased as `field`.
    ///
    /// The expression is inserted verbatim and must not contain placeholders.
    pub fn select_expression(&mut self, field: &str, expression: &str, options: FieldOptions) -> &mut Self {
        self.push_field(
            field,
            expression.to_string(),
            Some(alias_of(field)),
            options,
            Params::new(),
        )
    }

    /// Select one key of a dynamic column: `COLUMN_GET(`dyn_field`, ? AS data_type)`.
    ///
    /// The key is bound into this field's own params.
    pub fn select_dynamic(
        &mut self,
        field: &str,
        key: &str,
        data_type: &str,
        options: FieldOptions,
    ) -> &mut Self {
        let mut params = Params::new();
        let placeholder = params.bind(Value::Text(key.to_string()));
        let expression = column_get(field, placeholder, data_type);
        self.push_field(field, expression, Some(alias_of(field)), options, params)
    }

    /// [`select_dynamic`](Self::select_dynamic) cast to `CHAR(255)`.
    pub fn select_dynamic_char(&mut self, field: &str, key: &str, options: FieldOptions) -> &mut Self {
        self.select_dynamic(field, key, DEFAULT_DYNAMIC_TYPE, options)
    }

    /// Select a whole dynamic column as JSON: `COLUMN_JSON(`dyn_field`)`.
    ///
    /// Empty columns hydrate as absent, others as a [`Value::Json`] object. A
    /// callback passed in `options` runs instead of this decoding.
    pub fn select_dynamic_json(&mut self, field: &str, options: FieldOptions) -> &mut Self {
        let options = options.callback(decode_json);
        self.push_field(
            field,
            column_json(field),
            Some(alias_of(field)),
            options,
            Params::new(),
        )
    }

    /// `IFNULL(expr1, expr2)` aliased as `field`. Both expressions are raw SQL.
    pub fn select_if_null(
        &mut self,
        field: &str,
        expr1: &str,
        expr2: &str,
        options: FieldOptions,
    ) -> &mut Self {
        self.push_field(
            field,
            format!("IFNULL({expr1}, {expr2})"),
            Some(alias_of(field)),
            options,
            Params::new(),
        )
    }

    /// Remove the fields selected under `field`, together with their params.
    ///
    /// Every field with that name goes, so two `select_dynamic_char` reads of
    /// the same dynamic column are both removed. Use
    /// [`unselect_alias`](Self::unselect_alias) to drop only one of them.
    pub fn unselect(&mut self, field: &str) -> &mut Self {
        self.fields.retain(|d| d.name != field);
        self
    }

    /// Remove the field projected as `alias`, together with its params.
    pub fn unselect_alias(&mut self, alias: &str) -> &mut Self {
        self.fields.retain(|d| d.alias() != Some(alias));
        self
    }

    fn push_field(
        &mut self,
        field: &str,
        expression: String,
        alias: Option<String>,
        options: FieldOptions,
        params: Params,
    ) -> &mut Self {
        self.fields.push(FieldDescriptor::new(
            field,
            expression,
            alias,
            property_name(field),
            options,
            params,
        ));
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    // ==================== Composites ====================

    /// Register a composite property built from `C::default()` for every row.
    ///
    /// Fields reach it through [`FieldOptions::composite`]; `args` are passed
    /// to its [`Hydrate::finalize`].
    pub fn add_composite<C>(&mut self, property: &str, args: Vec<Value>) -> &mut Self
    where
        C: Hydrate + Default + Any,
    {
        self.add_composite_with(property, C::default, args)
    }

    /// Register a composite property built by `factory` for every row.
    pub fn add_composite_with<C, F>(&mut self, property: &str, factory: F, args: Vec<Value>) -> &mut Self
    where
        C: Hydrate + Any,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.composites.retain(|c| c.property != property);
        self.composites.push(Composite::new(property, factory, args));
        self
    }

    pub fn composites(&self) -> &[Composite] {
        &self.composites
    }

    // ==================== Joins ====================

    pub fn join(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.push_join(JoinKind::Plain, table, alias)
    }

    pub fn inner_join(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.push_join(JoinKind::Inner, table, alias)
    }

    pub fn left_join(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.push_join(JoinKind::Left, table, alias)
    }

    pub fn right_join(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.push_join(JoinKind::Right, table, alias)
    }

    /// `ON <raw>` for the most recent join.
    ///
    /// # Panics
    ///
    /// When no join has been added.
    pub fn on(&mut self, constraint: &str) -> &mut Self {
        self.last_join().constraint = Some(JoinConstraint::On(constraint.to_string()));
        self
    }

    /// `USING (`field`)` for the most recent join.
    ///
    /// # Panics
    ///
    /// When no join has been added.
    pub fn using(&mut self, field: &str) -> &mut Self {
        self.last_join().constraint = Some(JoinConstraint::Using(field.to_string()));
        self
    }

    fn push_join(&mut self, kind: JoinKind, table: &str, alias: Option<&str>) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: alias.map(str::to_string),
            constraint: None,
        });
        self
    }

    fn last_join(&mut self) -> &mut Join {
        self.joins
            .last_mut()
            .expect("join constraint given before any join")
    }

    // ==================== Conditions ====================

    condition_methods!();

    // ==================== Ordering / paging ====================

    /// `ORDER BY field ASC`. Calls accumulate, the first one is the primary key.
    ///
    /// `field` is written as given.
    pub fn order_by(&mut self, field: &str) -> &mut Self {
        self.order_by.push((field.to_string(), OrderDirection::Asc));
        self
    }

    pub fn order_by_desc(&mut self, field: &str) -> &mut Self {
        self.order_by.push((field.to_string(), OrderDirection::Desc));
        self
    }

    /// # Panics
    ///
    /// When `direction` is neither `ASC` nor `DESC` (any case).
    pub fn order_by_direction(&mut self, field: &str, direction: &str) -> &mut Self {
        let Some(direction) = OrderDirection::parse(direction) else {
            panic!("invalid ORDER BY direction {direction:?}, expected ASC or DESC");
        };
        self.order_by.push((field.to_string(), direction));
        self
    }

    /// ` LIMIT rows`. Replaces any earlier limit.
    pub fn limit(&mut self, rows: u64) -> &mut Self {
        self.limit = Some((rows, None));
        self
    }

    /// ` LIMIT rows OFFSET offset`. Replaces any earlier limit.
    ///
    /// Pass [`MAX_ROWS`] to skip `offset` rows and take the rest.
    pub fn limit_offset(&mut self, rows: u64, offset: u64) -> &mut Self {
        self.limit = Some((rows, Some(offset)));
        self
    }

    /// 1-based page of `per_page` rows.
    pub fn paginate(&mut self, page: u64, per_page: u64) -> &mut Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit_offset(per_page, offset)
    }

    // ==================== Fetch ====================

    /// Fetch all rows as generic [`Row`]s.
    pub fn fetch<C: Connection>(&self, conn: &mut C) -> OrmResult<Vec<Row>> {
        self.fetch_objects_with(conn, Row::new, &[])
    }

    /// Fetch all rows into `T::default()` targets. No rows is an empty vec.
    pub fn fetch_objects<T, C>(&self, conn: &mut C, args: &[Value]) -> OrmResult<Vec<T>>
    where
        T: Hydrate + Default,
        C: Connection,
    {
        self.fetch_objects_with(conn, T::default, args)
    }

    /// Fetch all rows into targets created by `factory`.
    pub fn fetch_objects_with<T, C, F>(&self, conn: &mut C, mut factory: F, args: &[Value]) -> OrmResult<Vec<T>>
    where
        T: Hydrate,
        C: Connection,
        F: FnMut() -> T,
    {
        let mut objects = Vec::new();
        self.run_fetch(conn, |slots, metadata| {
            let mut target = factory();
            hydrate_row(&mut target, &self.fields, metadata, &self.composites, slots, args)?;
            objects.push(target);
            Ok(())
        })?;
        Ok(objects)
    }

    /// Fetch exactly one row into a `T::default()` target.
    ///
    /// Forces `LIMIT 1`; no row is [`OrmError::NotFound`].
    pub fn fetch_object<T, C>(&mut self, conn: &mut C, args: &[Value]) -> OrmResult<T>
    where
        T: Hydrate + Default,
        C: Connection,
    {
        let mut target = T::default();
        self.fetch_into(conn, &mut target, args)?;
        Ok(target)
    }

    /// Fetch exactly one row into an existing target.
    ///
    /// Forces `LIMIT 1`; no row is [`OrmError::NotFound`].
    pub fn fetch_into<T, C>(&mut self, conn: &mut C, target: &mut T, args: &[Value]) -> OrmResult<()>
    where
        T: Hydrate + ?Sized,
        C: Connection,
    {
        self.limit(1);
        let rows = self.run_fetch(conn, |slots, metadata| {
            hydrate_row(&mut *target, &self.fields, metadata, &self.composites, slots, args)
        })?;
        if rows == 0 {
            return Err(OrmError::not_found(format!(
                "no row in {} matches the query",
                self.table
            )));
        }
        Ok(())
    }

    /// Prepare, bind, execute and feed every row to `on_row`. Returns the row count.
    ///
    /// The statement is closed on every path, including a failure in `on_row`.
    fn run_fetch<C, F>(&self, conn: &mut C, on_row: F) -> OrmResult<usize>
    where
        C: Connection,
        F: FnMut(&mut [Value], &[ColumnMeta]) -> OrmResult<()>,
    {
        self.validate()?;
        let sql = self.build_sql();
        let params = self.params();

        let mut stmt = prepare_bound(conn, &sql, &params)?;
        let read = self.read_rows(&mut stmt, on_row);
        let rows = close_statement(stmt, read)?;

        tracing::trace!(target: SQL_TARGET, rows, "rows fetched");
        Ok(rows)
    }

    fn read_rows<S, F>(&self, stmt: &mut S, mut on_row: F) -> OrmResult<usize>
    where
        S: Statement,
        F: FnMut(&mut [Value], &[ColumnMeta]) -> OrmResult<()>,
    {
        stmt.execute()?;
        let metadata = stmt.result_metadata()?;
        if metadata.len() != self.fields.len() {
            return Err(OrmError::validation(format!(
                "result has {} columns but {} fields are selected",
                metadata.len(),
                self.fields.len()
            )));
        }

        let mut slots = vec![Value::Null; self.fields.len()];
        let mut rows = 0;
        while stmt.fetch_row(&mut slots)? {
            rows += 1;
            on_row(&mut slots, &metadata)?;
        }
        Ok(rows)
    }
}

impl SqlBuilder for SelectBuilder {
    fn build_sql(&self) -> String {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(FieldDescriptor::projection)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {fields} FROM {}", quote_field(&self.table));
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&quote_field(alias));
        }
        for join in &self.joins {
            join.write(&mut sql);
        }
        sql.push_str(&self.where_sql());

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(field, direction)| format!("{field} {direction}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        match self.limit {
            Some((rows, Some(offset))) => sql.push_str(&format!(" LIMIT {rows} OFFSET {offset}")),
            Some((rows, None)) => sql.push_str(&format!(" LIMIT {rows}")),
            None => {}
        }
        sql
    }

    fn params(&self) -> Params {
        let mut own = Params::new();
        for field in &self.fields {
            own.extend(&field.params);
        }
        self.params_with_conditions(&own)
    }

    fn validate(&self) -> OrmResult<()> {
        if self.table.is_empty() {
            return Err(OrmError::validation("SELECT without a table"));
        }
        if self.fields.is_empty() {
            return Err(OrmError::validation(format!(
                "SELECT from {} has no fields",
                self.table
            )));
        }
        for field in &self.fields {
            if let Property::Composite { composite, .. } = &field.property {
                if !self.composites.iter().any(|c| &c.property == composite) {
                    return Err(OrmError::validation(format!(
                        "field `{}` targets unregistered composite `{composite}`",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Projection alias for a logical field name: its last segment.
fn alias_of(field: &str) -> String {
    field.rsplit('.').next().unwrap_or(field).to_string()
}

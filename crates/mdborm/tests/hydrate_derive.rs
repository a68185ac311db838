//! End-to-end hydration through `#[derive(Hydrate)]` over a scripted connection.

use std::sync::Arc;

use chrono::NaiveDate;
use mdborm::memory::{MemoryConnection, ResultSet};
use mdborm::{ColumnType, FieldOptions, Hydrate, OrmError, OrmResult, SelectBuilder, Value};

#[derive(Debug, Default, Hydrate)]
#[orm(finalize = "scale")]
struct Rating {
    average: f64,
    votes: u32,
    #[orm(skip)]
    label: String,
}

impl Rating {
    fn scale(&mut self, args: &[Value]) -> OrmResult<()> {
        let max = match args.first() {
            Some(Value::Int(max)) => *max,
            _ => 10,
        };
        self.label = format!("{:.1}/{max}", self.average);
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
struct Slug(String);

impl TryFrom<Value> for Slug {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) if !s.is_empty() => Ok(Slug(s)),
            other => Err(format!("cannot build a slug from {other:?}")),
        }
    }
}

#[derive(Debug, Default, Hydrate)]
#[orm(finalize = "after_fetch")]
struct Movie {
    id: i64,
    #[orm(property = "title")]
    display_title: String,
    release_year: Option<i32>,
    released: bool,
    premiere: Option<NaiveDate>,
    slug: Option<Arc<Slug>>,
    #[orm(composite)]
    rating: Option<Rating>,
    #[orm(skip)]
    summary: String,
}

impl Movie {
    fn after_fetch(&mut self, args: &[Value]) -> OrmResult<()> {
        let locale = args.first().and_then(Value::as_str).unwrap_or("en");
        self.summary = format!("[{locale}] {} ({})", self.display_title, self.id);
        Ok(())
    }
}

fn movie_query() -> SelectBuilder {
    let mut q = SelectBuilder::from_table_as("movies", "m");
    q.select("m.id")
        .select_dynamic_char("m.titles", "en", FieldOptions::new().property("title"))
        .select("m.release_year")
        .select("m.released")
        .select("m.premiere")
        .select_with("m.slug", FieldOptions::new().class::<Slug>())
        .select_if_null(
            "average",
            "r.average",
            "0",
            FieldOptions::new().composite("rating", "average"),
        )
        .select_with("r.votes", FieldOptions::new().composite("rating", "votes"))
        .left_join("ratings", Some("r"))
        .using("movie_id")
        .add_composite::<Rating>("rating", vec![Value::Int(5)]);
    q
}

fn movie_columns() -> ResultSet {
    ResultSet::new()
        .column("id", ColumnType::LongLong, 20)
        .column("titles", ColumnType::VarString, 255)
        .column("release_year", ColumnType::Short, 6)
        .column("released", ColumnType::Tiny, 1)
        .column("premiere", ColumnType::Date, 10)
        .column("slug", ColumnType::VarString, 255)
        .column("average", ColumnType::Double, 22)
        .column("votes", ColumnType::Long, 11)
}

#[test]
fn fetch_objects_hydrates_properties_and_composites() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        movie_columns()
            .row(vec![
                Value::Int(1),
                Value::Text("Alien".into()),
                Value::Int(1979),
                Value::Int(1),
                Value::Text("1979-05-25".into()),
                Value::Text("alien".into()),
                Value::Float(4.5),
                Value::Int(1200),
            ])
            .row(vec![
                Value::Int(2),
                Value::Text("Untitled".into()),
                Value::Null,
                Value::Int(0),
                Value::Null,
                Value::Null,
                Value::Float(0.0),
                Value::Null,
            ]),
    );

    let q = movie_query();
    let movies: Vec<Movie> = q
        .fetch_objects(&mut conn, &[Value::Text("fr".into())])
        .unwrap();

    assert_eq!(movies.len(), 2);

    let alien = &movies[0];
    assert_eq!(alien.id, 1);
    assert_eq!(alien.display_title, "Alien");
    assert_eq!(alien.release_year, Some(1979));
    assert!(alien.released);
    assert_eq!(alien.premiere, NaiveDate::from_ymd_opt(1979, 5, 25));
    assert_eq!(alien.slug.as_deref(), Some(&Slug("alien".into())));
    assert_eq!(alien.summary, "[fr] Alien (1)");
    let rating = alien.rating.as_ref().unwrap();
    assert_eq!(rating.votes, 1200);
    assert_eq!(rating.label, "4.5/5");

    let untitled = &movies[1];
    assert_eq!(untitled.release_year, None);
    assert!(!untitled.released);
    assert!(untitled.slug.is_none());
    // The composite is installed even when all of its columns are null or zero.
    let rating = untitled.rating.as_ref().unwrap();
    assert_eq!(rating.votes, 0);
    assert_eq!(rating.label, "0.0/5");

    let stmt = conn.last_statement().unwrap();
    assert_eq!(stmt.types, "s");
    assert_eq!(stmt.values, vec![Value::Text("en".into())]);
}

#[test]
fn fetch_object_into_existing_target() {
    let mut conn = MemoryConnection::new();
    conn.push_result(movie_columns().row(vec![
        Value::Int(7),
        Value::Text("Solaris".into()),
        Value::Int(1972),
        Value::Int(1),
        Value::Null,
        Value::Null,
        Value::Float(8.1),
        Value::Int(40),
    ]));

    let mut q = movie_query();
    q.and_where("m.id", 7);

    let mut movie = Movie {
        summary: "stale".into(),
        ..Movie::default()
    };
    q.fetch_into(&mut conn, &mut movie, &[]).unwrap();

    assert_eq!(movie.display_title, "Solaris");
    assert_eq!(movie.summary, "[en] Solaris (7)");
    assert!(conn.last_statement().unwrap().sql.ends_with(" WHERE `m`.`id` = ? LIMIT 1"));
}

#[test]
fn class_rule_failure_names_the_field() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        ResultSet::new()
            .column("slug", ColumnType::VarString, 255)
            .row(vec![Value::Text(String::new())]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select_with("slug", FieldOptions::new().class::<Slug>());
    let err = q.fetch_objects::<Movie, _>(&mut conn, &[]).unwrap_err();

    match err {
        OrmError::Decode { column, .. } => assert_eq!(column, "slug"),
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[test]
fn unknown_property_is_a_decode_error() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        ResultSet::new()
            .column("budget", ColumnType::LongLong, 20)
            .row(vec![Value::Int(11_000_000)]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select("budget");
    let err = q.fetch_object::<Movie, _>(&mut conn, &[]).unwrap_err();

    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "budget"));
}

#[test]
fn wrong_value_type_is_a_decode_error() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        ResultSet::new()
            .column("id", ColumnType::VarString, 20)
            .row(vec![Value::Text("one".into())]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select("id");
    let err = q.fetch_object::<Movie, _>(&mut conn, &[]).unwrap_err();

    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "id"));
}

//! Dynamic-column writes and reads, and custom placeholders, end to end.

use std::collections::BTreeMap;

use mdborm::memory::{MemoryConnection, ResultSet};
use mdborm::{
    ColumnType, FieldOptions, Row, SelectBuilder, SqlBuilder, ToValue, Value, insert_into, update,
};

struct Point(f64, f64);

impl ToValue for Point {
    const PLACEHOLDER: &'static str = "ST_GeomFromText(?)";

    fn to_value(&self) -> Value {
        Value::Text(format!("POINT({} {})", self.0, self.1))
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn insert_omits_falsy_entries_but_keeps_text_zero() {
    let mut conn = MemoryConnection::new();
    conn.push_write(3, 1);

    let attributes: Vec<(&str, Value)> = vec![
        ("sequels", text("0")),
        ("tagline", text("")),
        ("budget", Value::Int(0)),
        ("color", Value::Bool(false)),
        ("runtime", Value::Int(117)),
        ("remake", Value::Null),
        ("score", Value::Float(0.0)),
    ];

    let id = insert_into("movies")
        .set("title", "Alien")
        .set_dynamic("attributes", attributes)
        .execute(&mut conn)
        .unwrap();
    assert_eq!(id, 3);

    let stmt = conn.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `movies` SET `title` = ?, `dyn_attributes` = COLUMN_CREATE(?, ?, ?, ?)"
    );
    assert_eq!(stmt.types, "ssssd");
    assert_eq!(
        stmt.values,
        vec![
            text("Alien"),
            text("sequels"),
            text("0"),
            text("runtime"),
            Value::Int(117)
        ]
    );
}

#[test]
fn update_clears_dynamic_column_when_nothing_survives() {
    let mut conn = MemoryConnection::new();
    conn.push_write(0, 1);

    let empty: BTreeMap<String, String> = BTreeMap::new();
    let affected = update("movies")
        .set_dynamic("titles", empty)
        .and_where("id", 3)
        .execute(&mut conn)
        .unwrap();
    assert_eq!(affected, 1);

    let stmt = conn.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE `movies` SET `dyn_titles` = '' WHERE `id` = ?"
    );
    assert_eq!(stmt.values, vec![Value::Int(3)]);
}

#[test]
fn custom_placeholder_types_render_their_own_marker() {
    let mut q = insert_into("cinemas");
    q.set("name", "Rex")
        .set("location", Point(2.35, 48.87))
        .set_dynamic("extra", [("entrance", Point(2.351, 48.871))]);

    assert_eq!(
        q.build_sql(),
        "INSERT INTO `cinemas` SET `name` = ?, `location` = ST_GeomFromText(?), \
         `dyn_extra` = COLUMN_CREATE(?, ST_GeomFromText(?))"
    );
    assert_eq!(
        q.params().values(),
        &[
            text("Rex"),
            text("POINT(2.35 48.87)"),
            text("entrance"),
            text("POINT(2.351 48.871)")
        ]
    );
}

#[test]
fn custom_placeholder_in_conditions() {
    let mut q = SelectBuilder::from_table("cinemas");
    q.select("name")
        .and_where_op("rating", ">", 5)
        .and_where("location", Point(0.0, 0.0));

    assert_eq!(
        q.build_sql(),
        "SELECT `name` FROM `cinemas` WHERE `rating` > ? AND `location` = ST_GeomFromText(?)"
    );
    assert_eq!(q.params().types(), "ds");
}

#[test]
fn dynamic_keys_read_back_through_column_get_and_json() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        ResultSet::new()
            .column("id", ColumnType::LongLong, 20)
            .column("title", ColumnType::VarString, 255)
            .column("titles", ColumnType::Blob, 65535)
            .row(vec![
                Value::Int(3),
                text("Le huitième passager"),
                text(r#"{"en":"Alien","fr":"Le huitième passager"}"#),
            ]),
    );

    let mut q = SelectBuilder::from_table_as("movies", "m");
    q.select("m.id")
        .select_dynamic_char(
            "m.titles",
            "fr",
            FieldOptions::new().property("title").alias("title"),
        )
        .select_dynamic_json(
            "m.titles",
            FieldOptions::new().property("titles"),
        )
        .and_where("m.id", 3);

    let movie: Row = q.fetch_object(&mut conn, &[]).unwrap();

    assert_eq!(movie.try_get::<String>("title").unwrap(), "Le huitième passager");
    let titles: BTreeMap<String, String> = movie.try_get("titles").unwrap();
    assert_eq!(titles["en"], "Alien");

    let stmt = conn.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT `m`.`id`, COLUMN_GET(`m`.`dyn_titles`, ? AS CHAR(255)) AS `title`, \
         COLUMN_JSON(`m`.`dyn_titles`) AS `titles` FROM `movies` AS `m` \
         WHERE `m`.`id` = ? LIMIT 1"
    );
    assert_eq!(stmt.values, vec![text("fr"), Value::Int(3)]);
}

#[test]
fn malformed_column_json_is_a_decode_error() {
    let mut conn = MemoryConnection::new();
    conn.push_result(
        ResultSet::new()
            .column("titles", ColumnType::Blob, 65535)
            .row(vec![text("[1, 2]")]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select_dynamic_json("titles", FieldOptions::new());
    let err = q.fetch(&mut conn).unwrap_err();

    assert!(matches!(err, mdborm::OrmError::Decode { ref column, .. } if column == "titles"));
}

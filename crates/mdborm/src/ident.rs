//! SQL identifier quoting.
//!
//! Field and table names are written into statement text, never bound, so
//! they pass through [`quote_field`] or [`quote_dynamic_field`]:
//!
//! - Dotted names are split and every segment is wrapped in backticks:
//!   `movies.id` renders as `` `movies`.`id` ``.
//! - A bare `*` segment stays unquoted (`m.*`).
//! - Backticks inside a segment are doubled.
//!
//! Identifiers are expected to come from the application itself (constants and
//! schema knowledge), not from request input. Quoting keeps a stray name from
//! breaking out of the identifier, but nothing here checks that the name exists.
//!
//! # Example
//! ```
//! use mdborm::ident::{quote_dynamic_field, quote_field};
//!
//! assert_eq!(quote_field("movies.id"), "`movies`.`id`");
//! assert_eq!(quote_dynamic_field("m.titles"), "`m`.`dyn_titles`");
//! ```

use heck::ToLowerCamelCase;

/// Prefix of every dynamic (schema-less) column.
pub const DYNAMIC_PREFIX: &str = "dyn_";

/// Quote a plain, optionally table-qualified, field name.
pub fn quote_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    write_quoted(&mut out, name, None);
    out
}

/// Quote a dynamic column name: the last segment gets the [`DYNAMIC_PREFIX`].
pub fn quote_dynamic_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + DYNAMIC_PREFIX.len() + 4);
    write_quoted(&mut out, name, Some(DYNAMIC_PREFIX));
    out
}

/// Default property name for a selected field.
///
/// The table qualifier is dropped and the rest is lower camel case:
/// `m.release_year` maps to `releaseYear`.
pub fn property_name(field: &str) -> String {
    let last = field.rsplit('.').next().unwrap_or(field);
    last.to_lower_camel_case()
}

fn write_quoted(out: &mut String, name: &str, last_prefix: Option<&str>) {
    let segments = name.split('.').count();
    for (i, segment) in name.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        let is_last = i + 1 == segments;
        if segment == "*" && last_prefix.is_none() {
            out.push('*');
            continue;
        }
        out.push('`');
        if is_last {
            if let Some(prefix) = last_prefix {
                out.push_str(prefix);
            }
        }
        for ch in segment.chars() {
            if ch == '`' {
                out.push_str("``");
            } else {
                out.push(ch);
            }
        }
        out.push('`');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_simple() {
        assert_eq!(quote_field("name"), "`name`");
    }

    #[test]
    fn quote_qualified() {
        assert_eq!(quote_field("movies.id"), "`movies`.`id`");
    }

    #[test]
    fn quote_three_parts() {
        assert_eq!(quote_field("db.movies.id"), "`db`.`movies`.`id`");
    }

    #[test]
    fn quote_star() {
        assert_eq!(quote_field("m.*"), "`m`.*");
    }

    #[test]
    fn quote_doubles_backticks() {
        assert_eq!(quote_field("we`ird"), "`we``ird`");
    }

    #[test]
    fn quote_dynamic_plain() {
        assert_eq!(quote_dynamic_field("titles"), "`dyn_titles`");
    }

    #[test]
    fn quote_dynamic_prefixes_only_last_segment() {
        assert_eq!(quote_dynamic_field("movies.titles"), "`movies`.`dyn_titles`");
    }

    #[test]
    fn property_from_snake_case() {
        assert_eq!(property_name("release_year"), "releaseYear");
        assert_eq!(property_name("m.release_year"), "releaseYear");
        assert_eq!(property_name("id"), "id");
    }
}

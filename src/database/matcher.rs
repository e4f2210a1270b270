//! Filter evaluation, sorting and projection for the in-memory store.
//!
//! Covers the subset of the MongoDB query language the API produces:
//! equality, comparison operators, `$in`/`$nin`, `$regex`, `$exists` and
//! the `$and`/`$or`/`$nor` combinators.

use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};
use regex::RegexBuilder;

/// Whether `doc` satisfies `filter`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => each_clause(condition).all(|f| matches(doc, f)),
        "$or" => each_clause(condition).any(|f| matches(doc, f)),
        "$nor" => !each_clause(condition).any(|f| matches(doc, f)),
        field => field_matches(lookup(doc, field), condition),
    })
}

fn each_clause(condition: &Bson) -> impl Iterator<Item = &Document> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Bson::as_document)
}

/// Resolve a dotted path such as `category.name`.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_doc(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    let Some(ops) = is_operator_doc(condition) else {
        if let Bson::RegularExpression(re) = condition {
            return regex_matches(value, &re.pattern, &re.options);
        }
        return equals_or_contains(value, condition);
    };

    ops.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => equals_or_contains(value, operand),
        "$ne" => !equals_or_contains(value, operand),
        "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(value, operand, |o| o != Ordering::Less),
        "$lt" => ordered(value, operand, |o| o == Ordering::Less),
        "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
        "$in" => in_list(value, operand),
        "$nin" => !in_list(value, operand),
        "$exists" => value.is_some() == truthy(operand),
        "$regex" => {
            let options = ops.get_str("$options").unwrap_or_default();
            match operand {
                Bson::String(pattern) => regex_matches(value, pattern, options),
                Bson::RegularExpression(re) => regex_matches(value, &re.pattern, &re.options),
                _ => false,
            }
        }
        "$options" => true,
        _ => false,
    })
}

fn in_list(value: Option<&Bson>, operand: &Bson) -> bool {
    operand
        .as_array()
        .is_some_and(|list| list.iter().any(|candidate| equals_or_contains(value, candidate)))
}

/// Equality with array semantics: an array field matches if it equals the
/// operand or any element does. A missing field equals `null`.
fn equals_or_contains(value: Option<&Bson>, operand: &Bson) -> bool {
    match value {
        None => matches!(operand, Bson::Null),
        Some(Bson::Array(items)) => {
            values_equal(&Bson::Array(items.clone()), operand)
                || items.iter().any(|item| values_equal(item, operand))
        }
        Some(v) => values_equal(v, operand),
    }
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |v: &Bson| {
        same_kind(v, operand)
            && compare_values(v, operand).is_some_and(|o| accept(o))
    };
    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(v) => check(v),
    }
}

fn regex_matches(value: Option<&Bson>, pattern: &str, options: &str) -> bool {
    let Ok(re) = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .build()
    else {
        return false;
    };
    match value {
        Some(Bson::String(s)) => re.is_match(s),
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| re.is_match(s))),
        _ => false,
    }
}

fn truthy(b: &Bson) -> bool {
    match b {
        Bson::Boolean(v) => *v,
        Bson::Null => false,
        other => as_f64(other).is_none_or(|n| n != 0.0),
    }
}

fn as_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Comparison operators only apply between values of the same kind.
fn same_kind(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

/// Cross-type ordering, numbers compared by value.
fn type_rank(b: &Bson) -> u8 {
    match b {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        _ => 11,
    }
}

/// Total order used by `$gt`-style operators and sorting.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return Some(ra.cmp(&rb));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

/// Stable multi-key sort; missing fields sort before present ones.
pub fn sort(docs: &mut [Document], keys: &[(String, i32)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, direction) in keys {
            let ord = match (lookup(a, field), lookup(b, field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ord = if *direction < 0 { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Apply an inclusion or exclusion projection on top-level fields.
/// `_id` is kept unless explicitly excluded.
pub fn project(doc: Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return doc;
    }

    let inclusive = projection
        .iter()
        .any(|(k, v)| k != "_id" && truthy(v));
    let drop_id = projection.get("_id").is_some_and(|v| !truthy(v));

    if inclusive {
        doc.into_iter()
            .filter(|(k, _)| {
                if k == "_id" {
                    !drop_id
                } else {
                    projection.get(k).is_some_and(truthy)
                }
            })
            .collect()
    } else {
        doc.into_iter()
            .filter(|(k, _)| projection.get(k).is_none_or(truthy))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use mongodb::bson::oid::ObjectId;

    fn product() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "title": "Blue Running Shoes",
            "price": 120.5,
            "quantity": 10,
            "subcategories": ["a", "b"],
            "details": { "color": "blue" },
        }
    }

    #[test]
    fn test_equality_and_numeric_cross_type() {
        let p = product();
        assert!(matches(&p, &doc! { "quantity": 10_i64 }));
        assert!(matches(&p, &doc! { "quantity": 10.0 }));
        assert!(!matches(&p, &doc! { "quantity": 11 }));
        assert!(matches(&p, &doc! { "details.color": "blue" }));
    }

    #[test]
    fn test_array_contains() {
        let p = product();
        assert!(matches(&p, &doc! { "subcategories": "b" }));
        assert!(!matches(&p, &doc! { "subcategories": "c" }));
    }

    #[test]
    fn test_comparison_operators() {
        let p = product();
        assert!(matches(&p, &doc! { "price": { "$gte": 100, "$lt": 200 } }));
        assert!(!matches(&p, &doc! { "price": { "$gt": 200 } }));
        assert!(matches(&p, &doc! { "price": { "$ne": 50 } }));
        assert!(matches(&p, &doc! { "quantity": { "$in": [1, 10] } }));
        // Strings never compare against numbers
        assert!(!matches(&p, &doc! { "title": { "$gt": 5 } }));
    }

    #[test]
    fn test_regex_and_or() {
        let p = product();
        let filter = doc! {
            "$or": [
                { "title": { "$regex": "running", "$options": "i" } },
                { "description": { "$regex": "running", "$options": "i" } },
            ]
        };
        assert!(matches(&p, &filter));
        assert!(!matches(&p, &doc! { "title": { "$regex": "running" } }));
    }

    #[test]
    fn test_missing_field_is_null() {
        let p = product();
        assert!(matches(&p, &doc! { "brand": null }));
        assert!(matches(&p, &doc! { "brand": { "$exists": false } }));
    }

    #[test]
    fn test_sort_multi_key() {
        let mut docs = vec![
            doc! { "n": "b", "price": 1 },
            doc! { "n": "a", "price": 2 },
            doc! { "n": "c", "price": 2 },
        ];
        sort(&mut docs, &[("price".to_string(), -1), ("n".to_string(), 1)]);
        let names: Vec<_> = docs.iter().map(|d| d.get_str("n").unwrap()).collect();
        assert_eq!(names, ["a", "c", "b"]);
    }

    #[test]
    fn test_projection() {
        let p = product();
        let included = project(p.clone(), &doc! { "title": 1 });
        assert!(included.contains_key("_id"));
        assert!(included.contains_key("title"));
        assert!(!included.contains_key("price"));

        let excluded = project(p, &doc! { "price": 0, "_id": 0 });
        assert!(!excluded.contains_key("_id"));
        assert!(!excluded.contains_key("price"));
        assert!(excluded.contains_key("title"));
    }
}

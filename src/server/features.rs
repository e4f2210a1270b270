//! List query-string handling: filtering, keyword search, sorting,
//! field selection and pagination.

use mongodb::bson::{Bson, Document, doc};
use serde::Serialize;

use crate::database::FindOptions;
use crate::error::AppError;
use crate::utils::coerce_scalar;

pub const DEFAULT_LIMIT: u64 = 50;
const OPERATORS: &[&str] = &["gt", "gte", "lt", "lte", "ne", "in"];

/// A parsed list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub options: FindOptions,
    pub page: u64,
    pub limit: u64,
}

impl ListQuery {
    /// Parse query-string pairs. `search_fields` are matched by `keyword`.
    pub fn parse(params: &[(String, String)], search_fields: &[&str]) -> Result<Self, AppError> {
        let mut filter = Document::new();
        let mut page = 1;
        let mut limit = DEFAULT_LIMIT;
        let mut sort = vec![("createdAt".to_string(), -1)];
        let mut projection = None;

        for (key, value) in params {
            match key.as_str() {
                "page" => page = positive(value).unwrap_or(1),
                "limit" => limit = positive(value).unwrap_or(DEFAULT_LIMIT),
                "sort" => {
                    let parsed = parse_sort(value)?;
                    if !parsed.is_empty() {
                        sort = parsed;
                    }
                }
                "fields" => projection = parse_fields(value)?,
                "keyword" => {
                    let keyword = value.trim();
                    if !keyword.is_empty() && !search_fields.is_empty() {
                        filter.insert("$or", keyword_clauses(keyword, search_fields));
                    }
                }
                _ => add_filter(&mut filter, key, value)?,
            }
        }

        Ok(Self {
            filter,
            options: FindOptions {
                sort,
                skip: (page - 1).saturating_mul(limit),
                limit: Some(i64::try_from(limit).unwrap_or(i64::MAX)),
                projection,
            },
            page,
            limit,
        })
    }
}

fn positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

fn check_field(field: &str) -> Result<(), AppError> {
    let ok = !field.is_empty()
        && !field.starts_with('$')
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid field name: {field}")))
    }
}

/// `price,-createdAt` becomes `[(price, 1), (createdAt, -1)]`.
fn parse_sort(raw: &str) -> Result<Vec<(String, i32)>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let (field, direction) = match item.strip_prefix('-') {
                Some(field) => (field, -1),
                None => (item.trim_start_matches('+'), 1),
            };
            check_field(field)?;
            Ok((field.to_string(), direction))
        })
        .collect()
}

/// `name,price` includes, `-description` excludes. Mixing the two is only
/// allowed for `_id`.
fn parse_fields(raw: &str) -> Result<Option<Document>, AppError> {
    let mut projection = Document::new();
    let (mut includes, mut excludes) = (false, false);

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (field, flag) = match item.strip_prefix('-') {
            Some(field) => (field, 0),
            None => (item, 1),
        };
        check_field(field)?;
        if field != "_id" {
            if flag == 1 {
                includes = true;
            } else {
                excludes = true;
            }
        }
        projection.insert(field, flag);
    }

    if includes && excludes {
        return Err(AppError::BadRequest(
            "Cannot mix included and excluded fields".into(),
        ));
    }
    Ok((!projection.is_empty()).then_some(projection))
}

fn keyword_clauses(keyword: &str, fields: &[&str]) -> Vec<Document> {
    let pattern = regex::escape(keyword);
    fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            clause
        })
        .collect()
}

/// `price[gte]=10` becomes `{price: {$gte: 10}}`; plain keys are equality.
fn add_filter(filter: &mut Document, key: &str, value: &str) -> Result<(), AppError> {
    let Some((field, rest)) = key.split_once('[') else {
        check_field(key)?;
        filter.insert(key, coerce_scalar(value));
        return Ok(());
    };

    check_field(field)?;
    let op = rest.strip_suffix(']').unwrap_or(rest);
    if !OPERATORS.contains(&op) {
        return Err(AppError::BadRequest(format!(
            "Unsupported filter operator: {op}"
        )));
    }

    let operand = if op == "in" {
        Bson::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(coerce_scalar)
                .collect(),
        )
    } else {
        coerce_scalar(value)
    };

    match filter.get_mut(field) {
        Some(Bson::Document(ops)) => {
            ops.insert(format!("${op}"), operand);
        }
        _ => {
            let mut ops = Document::new();
            ops.insert(format!("${op}"), operand);
            filter.insert(field, ops);
        }
    }
    Ok(())
}

/// Fields for `paginationResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub limit: u64,
    pub number_of_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let end = page.saturating_mul(limit);
        Self {
            current_page: page,
            limit,
            number_of_pages: total.div_ceil(limit),
            next: (end < total).then(|| page.saturating_add(1)),
            prev: (page > 1).then(|| page - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let q = ListQuery::parse(&[], &["name"]).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 50);
        assert_eq!(q.options.skip, 0);
        assert_eq!(q.options.sort, vec![("createdAt".to_string(), -1)]);
        assert!(q.filter.is_empty());
    }

    #[test]
    fn test_pagination_and_sort() {
        let q = ListQuery::parse(
            &params(&[("page", "3"), ("limit", "5"), ("sort", "price,-name")]),
            &[],
        )
        .unwrap();
        assert_eq!(q.options.skip, 10);
        assert_eq!(q.options.limit, Some(5));
        assert_eq!(
            q.options.sort,
            vec![("price".to_string(), 1), ("name".to_string(), -1)]
        );
    }

    #[test]
    fn test_filters() {
        let id = ObjectId::new();
        let category = id.to_hex();
        let q = ListQuery::parse(
            &params(&[
                ("price[gte]", "10"),
                ("price[lt]", "99.5"),
                ("category", category.as_str()),
                ("colors[in]", "red,blue"),
            ]),
            &[],
        )
        .unwrap();
        assert_eq!(
            q.filter,
            doc! {
                "price": { "$gte": 10_i64, "$lt": 99.5 },
                "category": id,
                "colors": { "$in": ["red", "blue"] },
            }
        );
    }

    #[test]
    fn test_rejects_operator_injection() {
        assert!(ListQuery::parse(&params(&[("$where", "1")]), &[]).is_err());
        assert!(ListQuery::parse(&params(&[("price[where]", "1")]), &[]).is_err());
    }

    #[test]
    fn test_keyword_escapes_regex() {
        let q = ListQuery::parse(&params(&[("keyword", "a+b")]), &["name", "description"]).unwrap();
        let clauses = q.filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let first = clauses[0].as_document().unwrap();
        assert_eq!(
            first.get_document("name").unwrap().get_str("$regex").unwrap(),
            r"a\+b"
        );
    }

    #[test]
    fn test_fields() {
        let q = ListQuery::parse(&params(&[("fields", "name,price,-_id")]), &[]).unwrap();
        assert_eq!(q.options.projection, Some(doc! { "name": 1, "price": 1, "_id": 0 }));
        assert!(ListQuery::parse(&params(&[("fields", "name,-price")]), &[]).is_err());
    }

    #[test]
    fn test_pagination_result() {
        let p = Pagination::new(1, 5, 12);
        assert_eq!(p.number_of_pages, 3);
        assert_eq!(p.next, Some(2));
        assert_eq!(p.prev, None);

        let last = Pagination::new(3, 5, 12);
        assert_eq!(last.next, None);
        assert_eq!(last.prev, Some(2));
    }

    #[test]
    fn test_pagination_huge_page() {
        let q = ListQuery::parse(&params(&[("page", "18446744073709551615")]), &[]).unwrap();
        let p = Pagination::new(q.page, q.limit, 3);
        assert_eq!(p.current_page, u64::MAX);
        assert_eq!(p.next, None);
        assert_eq!(p.prev, Some(u64::MAX - 1));
    }
}

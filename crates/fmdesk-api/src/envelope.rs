// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Adapters from the backend's assorted response bodies to `ListPage`.
//!
//! Endpoints disagree on where the array lives and how pagination is spelled, so every
//! lookup below checks a fixed list of places in order and takes the first hit.

use fmdesk_app::{ConsoleError, ConsoleResult, EndpointDescriptor, ListPage, Pagination};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

const CURRENT_PAGE_KEYS: [&str; 3] = ["current_page", "current", "page"];
const TOTAL_PAGES_KEYS: [&str; 1] = ["total_pages"];
const TOTAL_COUNT_KEYS: [&str; 3] = ["total_count", "total_entries", "total"];
const PER_PAGE_KEYS: [&str; 1] = ["per_page"];

/// A 2xx body can still carry a failure: `success: false` or a `code` other than 200.
pub fn check_application(body: &Value) -> ConsoleResult<()> {
    let Some(object) = body.as_object() else {
        return Ok(());
    };

    let code = object.get("code").and_then(as_int);
    let failed = object.get("success").and_then(Value::as_bool) == Some(false)
        || code.is_some_and(|code| code != 200);
    if !failed {
        return Ok(());
    }

    Err(ConsoleError::Application {
        code: code.unwrap_or_default(),
        message: error_message(body).unwrap_or_else(|| fmdesk_app::GENERIC_FAILURE.to_owned()),
    })
}

/// Backend error text from `message`, `error` or `errors`, whichever is present first.
pub fn error_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;

    if let Some(message) = object.get("message").and_then(non_blank) {
        return Some(message);
    }

    match object.get("error") {
        Some(Value::Object(inner)) => {
            if let Some(message) = inner.get("message").and_then(non_blank) {
                return Some(message);
            }
        }
        Some(other) => {
            if let Some(message) = non_blank(other) {
                return Some(message);
            }
        }
        None => {}
    }

    let joined = match object.get("errors")? {
        Value::Array(entries) => entries
            .iter()
            .filter_map(non_blank)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(fields) => fields
            .iter()
            .flat_map(|(field, messages)| field_messages(field, messages))
            .collect::<Vec<_>>()
            .join("; "),
        other => non_blank(other).unwrap_or_default(),
    };
    (!joined.is_empty()).then_some(joined)
}

fn field_messages(field: &str, messages: &Value) -> Vec<String> {
    let texts: Vec<String> = match messages {
        Value::Array(entries) => entries.iter().filter_map(non_blank).collect(),
        other => non_blank(other).into_iter().collect(),
    };
    texts
        .into_iter()
        .map(|text| format!("{field} {text}"))
        .collect()
}

fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Item array for a list response: bare array, then each collection key at the top
/// level, then the same keys under `data`, then `data` itself.
pub fn extract_items<'a>(body: &'a Value, keys: &[&str]) -> ConsoleResult<&'a Vec<Value>> {
    if let Value::Array(items) = body {
        return Ok(items);
    }

    let top = body.as_object();
    let data = top.and_then(|object| object.get("data"));

    let under = |object: Option<&'a Map<String, Value>>| {
        keys.iter()
            .find_map(|key| object.and_then(|object| object.get(*key)?.as_array()))
    };

    under(top)
        .or_else(|| under(data.and_then(Value::as_object)))
        .or_else(|| data.and_then(Value::as_array))
        .ok_or_else(|| {
            let mut expected = vec!["a JSON array".to_owned()];
            expected.extend(keys.iter().map(|key| format!("`{key}`")));
            expected.push("`data`".to_owned());
            ConsoleError::shape(expected.join(" or "))
        })
}

/// Pagination as the backend reports it, or one derived from a reported total.
/// `None` when the body says nothing about totals.
pub fn extract_pagination(body: &Value, page: i64, per_page: i64) -> Option<Pagination> {
    let object = body.as_object()?;
    let nested = object
        .get("pagination")
        .or_else(|| object.get("data")?.get("pagination"))
        .and_then(Value::as_object);

    if let Some(block) = nested {
        return Some(read_pagination(block, page, per_page));
    }

    let total = object
        .get("total_count")
        .and_then(as_int)
        .or_else(|| object.get("meta")?.get("total").and_then(as_int))?;
    Some(Pagination::from_total(total, page, per_page))
}

fn read_pagination(block: &Map<String, Value>, page: i64, per_page: i64) -> Pagination {
    let current_page = first_int(block, &CURRENT_PAGE_KEYS).unwrap_or(page);
    let per_page = first_int(block, &PER_PAGE_KEYS)
        .filter(|size| *size > 0)
        .unwrap_or(per_page);
    let total_count = first_int(block, &TOTAL_COUNT_KEYS);
    let total_pages = first_int(block, &TOTAL_PAGES_KEYS)
        .or_else(|| {
            let derived = Pagination::from_total(total_count?, current_page, per_page);
            Some(derived.total_pages)
        })
        .unwrap_or(0)
        .max(0);

    let has_next = block
        .get("has_next_page")
        .and_then(Value::as_bool)
        .or_else(|| block.get("next_page").map(|next| !next.is_null()))
        .unwrap_or(current_page < total_pages);
    let has_prev = block
        .get("has_prev_page")
        .and_then(Value::as_bool)
        .or_else(|| block.get("prev_page").map(|prev| !prev.is_null()))
        .unwrap_or(current_page > 1);

    Pagination {
        current_page,
        total_pages,
        total_count: total_count.unwrap_or(total_pages.saturating_mul(per_page)),
        per_page,
        has_next,
        has_prev,
    }
}

fn first_int(block: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| block.get(*key).and_then(as_int))
}

/// Integers arrive as numbers or numeric strings depending on the endpoint.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn list_page<T: DeserializeOwned>(
    body: &Value,
    endpoint: &EndpointDescriptor,
    page: i64,
    per_page: i64,
) -> ConsoleResult<ListPage<T>> {
    let raw = extract_items(body, endpoint.collection_keys)?;
    let items = raw
        .iter()
        .map(|item| T::deserialize(item))
        .collect::<Result<Vec<T>, _>>()
        .map_err(|error| ConsoleError::shape(format!("list items of the declared type ({error})")))?;

    let pagination = extract_pagination(body, page, per_page);
    if pagination.is_none() {
        warn!(
            path = endpoint.collection_path,
            "response carries no pagination, falling back to item count"
        );
    }
    Ok(ListPage::new(items, pagination))
}

/// Single record from a member response: under the wrapper key, under `data`, or bare.
pub fn extract_record(body: &Value, wrapper_key: Option<&str>) -> ConsoleResult<Value> {
    if let Some(record) = wrapper_key
        .and_then(|key| body.get(key))
        .filter(|record| record.is_object())
    {
        return Ok(record.clone());
    }
    if let Some(record) = body.get("data").filter(|record| record.is_object()) {
        return Ok(record.clone());
    }
    if body.is_object() {
        return Ok(body.clone());
    }
    Err(ConsoleError::shape("a JSON object"))
}

#[cfg(test)]
mod tests {
    use super::{
        check_application, error_message, extract_items, extract_pagination, extract_record,
        list_page,
    };
    use fmdesk_app::{ConsoleError, ConsoleResult, ResourceKind};
    use serde::Deserialize;
    use serde_json::{Value, json};

    const KEYS: &[&str] = &["companies", "data"];

    #[test]
    fn items_lookup_order() -> ConsoleResult<()> {
        let bare = json!([{"id": 1}]);
        assert_eq!(extract_items(&bare, KEYS)?.len(), 1);

        let named = json!({"companies": [{"id": 1}, {"id": 2}], "data": [{"id": 9}]});
        assert_eq!(extract_items(&named, KEYS)?[0]["id"], json!(1));

        let nested = json!({"code": 200, "data": {"companies": [{"id": 3}]}});
        assert_eq!(extract_items(&nested, KEYS)?[0]["id"], json!(3));

        let data_array = json!({"data": [{"id": 4}]});
        assert_eq!(extract_items(&data_array, &["sites"])?[0]["id"], json!(4));
        Ok(())
    }

    #[test]
    fn missing_array_is_a_shape_error() {
        let error = extract_items(&json!({"companies": {"id": 1}}), KEYS)
            .expect_err("object is not a list");
        assert!(matches!(error, ConsoleError::Shape { .. }));
        assert!(error.to_string().contains("`companies`"));
    }

    #[test]
    fn pagination_aliases_are_accepted() {
        let body = json!({
            "data": [],
            "pagination": {"current": "2", "total_pages": 5, "total_entries": 48, "per_page": 10},
        });
        let pagination = extract_pagination(&body, 1, 25).expect("pagination block present");
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, 5);
        assert_eq!(pagination.total_count, 48);
        assert_eq!(pagination.per_page, 10);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn explicit_next_and_prev_flags_win() {
        let body = json!({
            "pagination": {"page": 3, "total_pages": 3, "next_page": null, "prev_page": 2},
        });
        let pagination = extract_pagination(&body, 3, 10).expect("pagination block present");
        assert!(!pagination.has_next);
        assert!(pagination.has_prev);

        let flagged = json!({"pagination": {"current_page": 1, "total_pages": 4, "has_next_page": false}});
        let pagination = extract_pagination(&flagged, 1, 10).expect("pagination block present");
        assert!(!pagination.has_next);
    }

    #[test]
    fn pagination_under_data_is_found() {
        let body = json!({"data": {"sites": [], "pagination": {"current_page": 1, "total_count": 31}}});
        let pagination = extract_pagination(&body, 1, 10).expect("nested pagination");
        assert_eq!(pagination.total_pages, 4);
    }

    #[test]
    fn totals_fall_back_to_top_level_count_then_meta() {
        let counted = json!({"items": [], "total_count": 21});
        assert_eq!(
            extract_pagination(&counted, 1, 10).map(|p| p.total_pages),
            Some(3)
        );

        let meta = json!({"items": [], "meta": {"total": 40}});
        assert_eq!(
            extract_pagination(&meta, 2, 20).map(|p| p.total_pages),
            Some(2)
        );

        assert_eq!(extract_pagination(&json!({"items": []}), 1, 10), None);
        assert_eq!(extract_pagination(&json!([]), 1, 10), None);
    }

    #[test]
    fn maximal_totals_from_the_backend_are_not_fatal() {
        let top_level = json!({"items": [], "total_count": i64::MAX});
        assert_eq!(
            extract_pagination(&top_level, 1, 10).map(|p| p.total_pages),
            Some(i64::MAX / 10 + 1)
        );

        let as_text = json!({
            "pagination": {"current_page": 1, "total_count": "9223372036854775807"}
        });
        let pagination =
            extract_pagination(&as_text, 1, 10).expect("pagination block present");
        assert_eq!(pagination.total_count, i64::MAX);
        assert_eq!(pagination.total_pages, i64::MAX / 10 + 1);
        assert!(pagination.has_next);
    }

    #[test]
    fn application_failures_inside_success_status() {
        assert!(check_application(&json!({"code": 200, "data": []})).is_ok());
        assert!(check_application(&json!([1, 2])).is_ok());

        let error = check_application(&json!({"code": 422, "message": "Site is locked"}))
            .expect_err("non-200 code is a failure");
        assert_eq!(
            error,
            ConsoleError::Application {
                code: 422,
                message: "Site is locked".to_owned()
            }
        );

        let error = check_application(&json!({"success": false, "error": "Denied"}))
            .expect_err("success=false is a failure");
        assert_eq!(error.user_message(), "Denied");
    }

    #[test]
    fn error_messages_from_every_field() {
        assert_eq!(
            error_message(&json!({"error": {"message": "bad token"}})),
            Some("bad token".to_owned())
        );
        assert_eq!(
            error_message(&json!({"errors": ["Name can't be blank", "Email is invalid"]})),
            Some("Name can't be blank; Email is invalid".to_owned())
        );
        assert_eq!(
            error_message(&json!({"errors": {"title": ["is too long"]}})),
            Some("title is too long".to_owned())
        );
        assert_eq!(error_message(&json!({"message": "  "})), None);
    }

    #[derive(Debug, Deserialize)]
    struct Company {
        id: i64,
        name: String,
    }

    #[test]
    fn typed_items_deserialize() -> ConsoleResult<()> {
        let endpoint = ResourceKind::Companies.endpoint();
        let body = json!({"companies": [{"id": 5, "name": "Harbor"}], "total_count": 1});
        let page = list_page::<Company>(&body, &endpoint, 1, 10)?;
        assert_eq!(page.items[0].id, 5);
        assert_eq!(page.items[0].name, "Harbor");
        assert_eq!(page.pagination.map(|p| p.total_pages), Some(1));

        let bad = json!({"companies": [{"id": "x"}]});
        assert!(list_page::<Company>(&bad, &endpoint, 1, 10).is_err());
        Ok(())
    }

    #[test]
    fn record_unwraps_wrapper_then_data() -> ConsoleResult<()> {
        let wrapped = json!({"banner": {"id": 1, "title": "Hi"}});
        assert_eq!(extract_record(&wrapped, Some("banner"))?["id"], json!(1));

        let data = json!({"code": 200, "data": {"id": 2}});
        assert_eq!(extract_record(&data, Some("banner"))?["id"], json!(2));

        let bare = json!({"id": 3});
        assert_eq!(extract_record(&bare, None)?["id"], json!(3));

        assert!(extract_record(&Value::Null, None).is_err());
        Ok(())
    }
}

use serde_json::Value;

use crate::core::source::{FetchError, TransactionPage};

const TRANSACTION_TYPE: &str = "transactions";
const MAX_ERROR_TEXT: usize = 100;

/// How a single page item contributes to a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind<'a> {
    /// Well-formed transaction; counts toward the processed total.
    Transaction { counterpart: Option<&'a str> },
    /// Some other resource type on the page. Ignored.
    Other,
    /// Transaction-shaped but unusable. Skipped.
    Malformed,
}

pub fn classify(record: &Value) -> RecordKind<'_> {
    let Some(object) = record.as_object() else {
        return RecordKind::Malformed;
    };
    if object.get("type").and_then(Value::as_str) != Some(TRANSACTION_TYPE) {
        return RecordKind::Other;
    }

    let attributes = match object.get("attributes") {
        None | Some(Value::Null) => return RecordKind::Transaction { counterpart: None },
        Some(Value::Object(attributes)) => attributes,
        Some(_) => return RecordKind::Malformed,
    };

    match attributes.get("sent_to") {
        None | Some(Value::Null) => RecordKind::Transaction { counterpart: None },
        Some(Value::String(to)) if to.trim().is_empty() => {
            RecordKind::Transaction { counterpart: None }
        }
        Some(Value::String(to)) => RecordKind::Transaction {
            counterpart: Some(to.trim()),
        },
        Some(_) => RecordKind::Malformed,
    }
}

/// Split a decoded response body into records and the `links.next` pointer.
pub fn parse_page(body: Value) -> Result<TransactionPage, FetchError> {
    let Value::Object(mut object) = body else {
        return Err(FetchError::MalformedBody("expected a JSON object".to_string()));
    };

    let records = match object.remove("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(FetchError::MalformedBody(
                "`data` is not an array".to_string(),
            ));
        }
    };

    let next = object
        .get("links")
        .and_then(|links| links.get("next"))
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
        .map(str::to_string);

    Ok(TransactionPage { records, next })
}

/// Human-readable detail from an error response body, `None` for an empty body.
///
/// Non-JSON bodies are cut to 100 characters and always end in `...`.
pub fn describe_error_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            let first_error = json
                .get("errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first());
            let detail = match first_error {
                Some(error) => error.get("detail"),
                None => json.get("message"),
            };
            detail
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| json.to_string())
        }
        Err(_) => {
            let truncated: String = body.chars().take(MAX_ERROR_TEXT).collect();
            format!("{truncated}...")
        }
    };
    Some(detail)
}

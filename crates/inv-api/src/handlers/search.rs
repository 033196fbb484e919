//! Search handler
//!
//! HTML forms post every value as text, so `id` and `has_photo` are accepted
//! as numbers, booleans or strings.

use axum::{extract::State, Json};
use inv_core::Id;
use inv_registry::SearchSummary;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, FormBody};

/// A scalar as sent by JSON clients or HTML forms
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseValue {
    /// Integer value, reading only the leading digits of text
    pub fn as_id(&self) -> Option<Id> {
        match self {
            LooseValue::Int(n) => Some(*n),
            LooseValue::Float(f) if f.is_finite() => Some(f.trunc() as Id),
            LooseValue::Text(s) => leading_integer(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        match self {
            LooseValue::Bool(b) => *b,
            LooseValue::Int(n) => *n != 0,
            LooseValue::Float(f) => *f != 0.0,
            LooseValue::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "1" | "yes"
            ),
        }
    }
}

fn leading_integer(s: &str) -> Option<Id> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<Id>().ok().map(|n| sign * n)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub id: Option<LooseValue>,
    #[serde(default)]
    pub has_photo: Option<LooseValue>,
}

/// Look an item up by id
///
/// POST /search
pub async fn search_item(
    State(state): State<AppState>,
    FormBody(request): FormBody<SearchRequest>,
) -> ApiResult<Json<SearchSummary>> {
    let id = request
        .id
        .as_ref()
        .and_then(LooseValue::as_id)
        .ok_or_else(|| ApiError::bad_request("id is required"))?;
    let include_photo = request.has_photo.as_ref().is_some_and(LooseValue::as_flag);

    let summary = state.inventory.search(id, include_photo).await?;
    Ok(Json(summary))
}

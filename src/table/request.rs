//! Server-side table request parameters.
//!
//! The client sends flat query pairs with bracketed keys
//! (`order[0][column]=2&order[0][dir]=desc&search[value]=bob`), which a plain
//! struct deserializer cannot express, so the pairs are folded here.

use std::collections::BTreeMap;

use serde::Deserialize;
use strum_macros::EnumString;
use utoipa::IntoParams;

use crate::error::AppError;

/// Page size the client uses when it sends none.
pub const DEFAULT_LENGTH: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub column: usize,
    pub dir: SortDirection,
}

/// One data request for the attendance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    /// Echoed back so the client can drop stale responses.
    pub draw: u64,
    pub start: u64,
    /// Negative means all rows.
    pub length: i64,
    pub search: Option<String>,
    pub order: Vec<OrderRequest>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            draw: 0,
            start: 0,
            length: DEFAULT_LENGTH,
            search: None,
            order: Vec::new(),
            date_from: None,
            date_to: None,
        }
    }
}

/// Documented subset of the query string, for the OpenAPI page only.
#[allow(dead_code)]
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TableQueryDoc {
    /// Request counter echoed in the response
    pub draw: Option<u64>,
    /// Row offset
    pub start: Option<u64>,
    /// Page size, `-1` for all rows
    pub length: Option<i64>,
    /// Free-text search, sent as `search[value]`
    #[param(rename = "search[value]")]
    pub search: Option<String>,
    /// Sort column index, sent as `order[i][column]`
    #[param(rename = "order[0][column]")]
    pub order_column: Option<usize>,
    /// `asc` or `desc`, sent as `order[i][dir]`
    #[param(rename = "order[0][dir]")]
    pub order_dir: Option<String>,
    /// Inclusive lower date bound, `YYYY-MM-DD`
    #[serde(rename = "dateFrom")]
    pub date_from: Option<String>,
    /// Inclusive upper date bound, `YYYY-MM-DD`
    #[serde(rename = "dateTo")]
    pub date_to: Option<String>,
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{key} must be a number, got {value:?}")))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits `order[3][dir]` into `(3, "dir")`.
fn order_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("order[")?;
    let (index, rest) = rest.split_once("][")?;
    let field = rest.strip_suffix(']')?;
    Some((index.parse().ok()?, field))
}

impl TableRequest {
    pub fn from_pairs<I>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut req = TableRequest::default();
        let mut order: BTreeMap<usize, (Option<usize>, Option<SortDirection>)> = BTreeMap::new();

        for (key, value) in pairs {
            match key.as_str() {
                "draw" => req.draw = parse_num(&key, &value)?,
                "start" => req.start = parse_num(&key, &value)?,
                "length" => req.length = parse_num(&key, &value)?,
                "search[value]" | "search" => req.search = non_empty(value),
                "dateFrom" => req.date_from = non_empty(value),
                "dateTo" => req.date_to = non_empty(value),
                _ => {
                    if let Some((index, field)) = order_key(&key) {
                        let entry = order.entry(index).or_default();
                        match field {
                            "column" => entry.0 = Some(parse_num(&key, &value)?),
                            "dir" => {
                                entry.1 = Some(value.parse().map_err(|_| {
                                    AppError::BadRequest(format!(
                                        "{key} must be asc or desc, got {value:?}"
                                    ))
                                })?)
                            }
                            _ => {}
                        }
                    }
                    // columns[i][...] and cache busters are ignored
                }
            }
        }

        req.order = order
            .into_values()
            .filter_map(|(column, dir)| {
                column.map(|column| OrderRequest {
                    column,
                    dir: dir.unwrap_or(SortDirection::Asc),
                })
            })
            .collect();

        Ok(req)
    }

    /// `None` when every remaining row is requested.
    pub fn page_length(&self) -> Option<u64> {
        u64::try_from(self.length).ok()
    }
}

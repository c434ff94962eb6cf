//! Feed pages and response envelope.

use outage_core::{Error, FetchWindow, Result, Series};
use serde::Deserialize;
use serde_json::Value;

/// Parameters of one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub series: Series,
    pub window: FetchWindow,
    pub offset: usize,
    pub length: usize,
}

/// One bounded batch of raw records, sorted descending by period.
///
/// Records stay as raw JSON so that one malformed entry is rejected by the
/// loader instead of failing the whole page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub offset: usize,
    pub requested: usize,
    pub records: Vec<Value>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A page with fewer records than requested is the last one.
    pub fn is_short(&self) -> bool {
        self.records.len() < self.requested
    }
}

/// `{ "response": { "data": [...] } }`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Decode a response body for `request`.
///
/// A missing `response` or `response.data` is an empty page; a body that is
/// not a JSON object is a fetch error.
pub fn parse_page(body: &[u8], request: &PageRequest) -> Result<Page> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| Error::transient_fetch(format!("malformed feed payload: {}", e)))?;

    let records = envelope
        .response
        .and_then(|r| r.data)
        .unwrap_or_default();

    Ok(Page {
        offset: request.offset,
        requested: request.length,
        records,
    })
}

//! Region lookup: query assembly and result mapping.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use vellum::solr::{OcrDocument, SolrClient};

/// Coordinate convention selected by the `coordFormat` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordFormat {
    OpenLayers,
    Tesseract,
}

impl CoordFormat {
    /// The exact value "openLayers" selects the OpenLayers convention;
    /// anything else, including an absent parameter, selects the raw
    /// Tesseract convention.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("openLayers") => CoordFormat::OpenLayers,
            _ => CoordFormat::Tesseract,
        }
    }
}

/// Page identifiers carried in the target URI path.
#[derive(Debug, PartialEq, Eq)]
pub struct PageRef {
    pub collection: String,
    pub item_id: String,
    pub seq_num: String,
}

/// One matched word and its position tokens, in backend order.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionMatch {
    pub term: String,
    pub coordinates: Vec<String>,
}

/// Body of a region lookup response.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionsPayload {
    pub terms: Vec<RegionMatch>,
}

/// Decompose a target URI into page identifiers.
///
/// Both absolute URIs and bare paths are accepted; only the path is used.
/// Segments are read positionally as `/<collection>/<type>/<item_id>/<seq_num>`
/// where the `<type>` segment is not part of the index schema and is skipped.
/// Missing trailing segments yield empty identifiers, not errors.
pub fn parse_target_uri(target: &str) -> Result<PageRef> {
    let url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://placeholder")?
            .join(target)
            .context("target URI is not a valid path")?,
        Err(e) => return Err(e).context("target URI is not parseable"),
    };

    let mut segments = url.path().split('/');
    segments.next(); // empty segment before the leading '/'
    let collection = segments.next().unwrap_or("").to_string();
    segments.next(); // item type, not indexed
    let item_id = segments.next().unwrap_or("").to_string();
    let seq_num = segments.next().unwrap_or("").to_string();

    Ok(PageRef {
        collection,
        item_id,
        seq_num,
    })
}

/// Characters reserved by the Solr query parser.
const QUERY_METACHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Backslash-escape Solr query metacharacters in one field value.
fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if QUERY_METACHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Rewrite free-text search terms into a disjunction: every run of
/// whitespace becomes one `" OR "` boundary, with metacharacters escaped
/// per term before joining.
fn rewrite_terms(search_terms: &str) -> String {
    search_terms
        .split_whitespace()
        .map(escape_query_value)
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Compose the select query for a term disjunction on one page.
pub fn build_query(search_terms: &str, page: &PageRef) -> String {
    format!(
        "word:({}) collection:{} item_id:{} seq_num:{}",
        rewrite_terms(search_terms),
        escape_query_value(&page.collection),
        escape_query_value(&page.item_id),
        escape_query_value(&page.seq_num),
    )
}

/// Map Solr documents to region matches, preserving backend order.
/// A document missing the chosen coordinate field maps to an empty list.
fn map_documents(docs: Vec<OcrDocument>, format: CoordFormat) -> Vec<RegionMatch> {
    docs.into_iter()
        .map(|doc| {
            let coords = match format {
                CoordFormat::OpenLayers => doc.openlayers_coords,
                CoordFormat::Tesseract => doc.tesseract_coords,
            };
            RegionMatch {
                term: doc.word,
                coordinates: coords
                    .as_deref()
                    .unwrap_or("")
                    .split_whitespace()
                    .map(String::from)
                    .collect(),
            }
        })
        .collect()
}

/// Execute one region lookup: compose the query, issue the single select
/// call, and map the returned documents.
pub async fn execute_lookup(
    client: &SolrClient,
    page: &PageRef,
    search_terms: &str,
    format: CoordFormat,
) -> Result<RegionsPayload> {
    let query = build_query(search_terms, page);
    debug!("Solr query: {}", query);

    let selected = client.select(&query).await?;
    debug!("{} matching documents", selected.response.num_found);

    Ok(RegionsPayload {
        terms: map_documents(selected.response.docs, format),
    })
}

/// Encode the payload as JSON, or as a JSONP call when a non-empty
/// callback name is present. Returns the body and its content type.
pub fn encode_body(
    payload: &RegionsPayload,
    callback: Option<&str>,
) -> Result<(String, &'static str)> {
    let json = serde_json::to_string(payload)?;

    Ok(match callback {
        Some(name) if !name.is_empty() => (format!("{}({})", name, json), "application/javascript"),
        _ => (json, "application/json"),
    })
}

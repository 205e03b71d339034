//! Solr client and select operation.

mod client;

pub use client::{OcrDocument, SelectBody, SelectResponse, SolrClient};

//! Vellum - OCR word-region lookup backed by Solr
//!
//! This library provides the shared Solr client used by the region lookup server.

pub mod solr;

pub use solr::SolrClient;

//! Solr client wrapper.

use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// Solr client wrapper with connection configuration
#[derive(Clone)]
pub struct SolrClient {
    client: Client,
    select_url: Url,
    ping_url: Url,
}

/// Envelope of a Solr select response (`wt=json`).
#[derive(Debug, Deserialize)]
pub struct SelectResponse {
    pub response: SelectBody,
}

#[derive(Debug, Deserialize)]
pub struct SelectBody {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    pub docs: Vec<OcrDocument>,
}

/// One indexed OCR word with its page position in both coordinate
/// conventions. Coordinate fields hold whitespace-separated number tokens.
#[derive(Debug, Deserialize)]
pub struct OcrDocument {
    pub word: String,
    #[serde(default)]
    pub openlayers_coords: Option<String>,
    #[serde(default)]
    pub tesseract_coords: Option<String>,
}

impl SolrClient {
    /// Create a new client for one Solr core
    pub fn new(solr_url: &str, core: &str) -> Result<Self> {
        let mut base = solr_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;

        let client = Client::builder()
            .user_agent("Vellum/0.1 (ocr region lookup)")
            .build()?;

        Ok(Self {
            client,
            select_url: base.join(&format!("{}/select", core))?,
            ping_url: base.join(&format!("{}/admin/ping", core))?,
        })
    }

    /// Issue one select call with `q` as the sole query parameter.
    /// Result limit and ordering are left to the core's defaults.
    pub async fn select(&self, query: &str) -> Result<SelectResponse> {
        let response = self
            .client
            .get(self.select_url.clone())
            .query(&[("q", query), ("wt", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Solr select returned status {}", response.status());
        }

        Ok(response.json::<SelectResponse>().await?)
    }

    /// Check that the core answers its ping handler
    pub async fn ping(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.ping_url.clone())
            .query(&[("wt", "json")])
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::Json, routing::get, Router};
    use serde_json::json;

    /// Serve a canned select response on 127.0.0.1 and return the base URL.
    async fn spawn_stub(body: serde_json::Value, status: StatusCode) -> String {
        let app = Router::new().route(
            "/solr/ocr/select",
            get(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/solr", addr)
    }

    #[tokio::test]
    async fn test_select_parses_documents() {
        let body = json!({
            "responseHeader": {"status": 0, "QTime": 1},
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [
                    {
                        "word": "whale",
                        "seq_num": 7,
                        "openlayers_coords": "10 20 30 40",
                        "tesseract_coords": "1 2 3 4"
                    },
                    {"word": "ship", "seq_num": 7, "tesseract_coords": "5 6 7 8"}
                ]
            }
        });
        let base = spawn_stub(body, StatusCode::OK).await;

        let client = SolrClient::new(&base, "ocr").unwrap();
        let result = client.select("word:(whale)").await.unwrap();

        assert_eq!(result.response.num_found, 2);
        assert_eq!(result.response.docs.len(), 2);
        assert_eq!(result.response.docs[0].word, "whale");
        assert_eq!(
            result.response.docs[0].openlayers_coords.as_deref(),
            Some("10 20 30 40")
        );
        assert_eq!(result.response.docs[1].openlayers_coords, None);
    }

    #[tokio::test]
    async fn test_select_propagates_error_status() {
        let base = spawn_stub(json!({"error": "boom"}), StatusCode::INTERNAL_SERVER_ERROR).await;

        let client = SolrClient::new(&base, "ocr").unwrap();
        let result = client.select("word:(whale)").await;

        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_join_keeps_solr_path() {
        let client = SolrClient::new("http://localhost:8983/solr", "ocr").unwrap();
        assert_eq!(
            client.select_url.as_str(),
            "http://localhost:8983/solr/ocr/select"
        );
        assert_eq!(
            client.ping_url.as_str(),
            "http://localhost:8983/solr/ocr/admin/ping"
        );
    }
}

//! Spreadsheet export of extraction results.
//!
//! Creates a new spreadsheet and appends one row per post under a fixed
//! header. The access token comes from a [`TokenProvider`]; obtaining it is
//! the host's business.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{ExtractionResult, SavedPost};

/// Column headers, in row order.
pub const HEADER_ROW: [&str; 4] = ["Author", "Content", "Timestamp", "URL"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data to export")]
    Empty,
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
}

/// Supplies a bearer token for the spreadsheet API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExportError::CredentialUnavailable`] when no token can be obtained.
    async fn access_token(&self) -> Result<String, ExportError>;
}

/// A token handed over by the environment.
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, ExportError> {
        self.0
            .clone()
            .ok_or_else(|| ExportError::CredentialUnavailable("no access token configured".to_string()))
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub spreadsheet_id: String,
    pub url: String,
    pub rows_added: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

/// One sheet row per post, in [`HEADER_ROW`] order.
#[must_use]
pub fn post_row(post: &SavedPost) -> [String; 4] {
    [
        post.author.clone(),
        post.content.clone(),
        post.timestamp.clone(),
        post.url.clone(),
    ]
}

pub struct SheetsExporter {
    client: reqwest::Client,
    base_url: String,
}

impl SheetsExporter {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a spreadsheet and append the header plus one row per post.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Empty`] for an empty result, a credential error
    /// if no token is available, or an API error if either call fails.
    pub async fn export(
        &self,
        tokens: &dyn TokenProvider,
        result: &ExtractionResult,
    ) -> Result<ExportReport, ExportError> {
        if result.is_empty() {
            return Err(ExportError::Empty);
        }
        let token = tokens.access_token().await?;

        let title = format!(
            "LinkedIn Saved Posts - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let spreadsheet_id = self.create_spreadsheet(&token, &title).await?;
        self.append_rows(&token, &spreadsheet_id, &result.posts).await?;

        let report = ExportReport {
            url: format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}"),
            spreadsheet_id,
            rows_added: result.count,
        };
        info!(url = %report.url, rows = report.rows_added, "Exported saved posts");
        Ok(report)
    }

    async fn create_spreadsheet(&self, token: &str, title: &str) -> Result<String, ExportError> {
        let response = self
            .client
            .post(format!("{}/spreadsheets", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&serde_json::json!({ "properties": { "title": title } }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Api {
                operation: "create spreadsheet",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let created: CreatedSpreadsheet = response.json().await?;
        debug!(spreadsheet_id = %created.spreadsheet_id, "Spreadsheet created");
        Ok(created.spreadsheet_id)
    }

    async fn append_rows(
        &self,
        token: &str,
        spreadsheet_id: &str,
        posts: &[SavedPost],
    ) -> Result<(), ExportError> {
        let mut values = vec![HEADER_ROW.map(String::from)];
        values.extend(posts.iter().map(post_row));

        let response = self
            .client
            .post(format!(
                "{}/spreadsheets/{spreadsheet_id}/values/Sheet1!A1:append",
                self.base_url
            ))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&serde_json::json!({ "values": values }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Api {
                operation: "append rows",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMethod, IdSource};

    #[test]
    fn test_post_row_order() {
        let post = SavedPost {
            id: "urn:li:activity:1".to_string(),
            id_source: IdSource::Urn,
            author: "A".to_string(),
            content: "C".to_string(),
            url: "U".to_string(),
            timestamp: "T".to_string(),
            extraction_method: ExtractionMethod::Dom,
            author_profile: None,
            saved_at: None,
            media: None,
            engagement: None,
        };
        assert_eq!(post_row(&post), ["A", "C", "T", "U"].map(String::from));
    }

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(
            StaticToken::new(Some("tok".to_string())).access_token().await.unwrap(),
            "tok"
        );
        assert!(matches!(
            StaticToken::new(Some("  ".to_string())).access_token().await,
            Err(ExportError::CredentialUnavailable(_))
        ));
        assert!(StaticToken::new(None).access_token().await.is_err());
    }
}

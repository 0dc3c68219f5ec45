use crate::config::GoogleSettings;
use crate::domain::model::{SpreadsheetLocator, WorksheetRef};
use crate::domain::ports::{SheetStore, TokenSource};
use crate::utils::error::{BotError, Result};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_cells: Option<u64>,
}

/// `'Tab'!A1` with quotes doubled inside the tab title.
pub fn a1_range(tab: &str, cell: &str) -> String {
    format!("'{}'!{}", tab.replace('\'', "''"), cell)
}

/// Drive search term for a spreadsheet with exactly this title.
pub fn title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}

/// Minimal Sheets v4 / Drive v3 client: locate a spreadsheet, check a tab,
/// and read or write single cells.
pub struct GoogleSheetsClient<T: TokenSource> {
    client: Client,
    tokens: T,
    sheets_base_url: String,
    drive_base_url: String,
}

impl<T: TokenSource> GoogleSheetsClient<T> {
    pub fn new(
        tokens: T,
        sheets_base_url: impl Into<String>,
        drive_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            tokens,
            sheets_base_url: sheets_base_url.into().trim_end_matches('/').to_string(),
            drive_base_url: drive_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(tokens: T, settings: &GoogleSettings) -> Result<Self> {
        Self::new(
            tokens,
            &settings.sheets_base_url,
            &settings.drive_base_url,
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/v4/spreadsheets/{}/values",
            self.sheets_base_url, spreadsheet_id
        ))
        .map_err(|e| BotError::config(format!("Invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BotError::config("Sheets base URL cannot carry a path"))?
            .push(range);
        Ok(url)
    }

    async fn check(service: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!("{} returned {}: {}", service, status, body);
        Err(BotError::ApiResponseError {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn find_spreadsheet_by_title(&self, title: &str) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let query = title_query(title);
        tracing::debug!("Searching Drive for spreadsheet '{}'", title);

        let response = self
            .client
            .get(format!("{}/drive/v3/files", self.drive_base_url))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "10"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;
        let list: DriveFileList = Self::check("Google Drive", response).await?.json().await?;

        let mut files = list.files.into_iter();
        let first = files.next().ok_or_else(|| BotError::SpreadsheetNotFound {
            name: title.to_string(),
        })?;
        if files.next().is_some() {
            tracing::warn!(
                "Several spreadsheets are named '{}'; using {}",
                title,
                first.id
            );
        }
        tracing::debug!(
            "Resolved spreadsheet '{}' to {}",
            first.name.as_deref().unwrap_or(title),
            first.id
        );
        Ok(first.id)
    }

    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(format!(
                "{}/v4/spreadsheets/{}",
                self.sheets_base_url, spreadsheet_id
            ))
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BotError::SpreadsheetNotFound {
                name: spreadsheet_id.to_string(),
            });
        }
        let metadata: SpreadsheetMetadata =
            Self::check("Google Sheets", response).await?.json().await?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }
}

#[async_trait::async_trait]
impl<T: TokenSource> SheetStore for GoogleSheetsClient<T> {
    async fn open_worksheet(&self, locator: &SpreadsheetLocator, tab: &str) -> Result<WorksheetRef> {
        tracing::debug!("Opening spreadsheet {}...", locator);
        let spreadsheet_id = match locator {
            SpreadsheetLocator::Id(id) => id.clone(),
            SpreadsheetLocator::Title(title) => self.find_spreadsheet_by_title(title).await?,
        };

        let titles = self.sheet_titles(&spreadsheet_id).await?;
        if !titles.iter().any(|t| t == tab) {
            tracing::debug!("Available tabs: {:?}", titles);
            return Err(BotError::WorksheetNotFound {
                name: tab.to_string(),
                spreadsheet_id,
            });
        }

        tracing::debug!("Using worksheet '{}'.", tab);
        Ok(WorksheetRef {
            spreadsheet_id,
            title: tab.to_string(),
        })
    }

    async fn read_cell(&self, worksheet: &WorksheetRef, cell: &str) -> Result<Option<String>> {
        let token = self.tokens.access_token().await?;
        let url = self.values_url(&worksheet.spreadsheet_id, &a1_range(&worksheet.title, cell))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("valueRenderOption", "FORMATTED_VALUE")])
            .send()
            .await?;
        let range: ValueRange = Self::check("Google Sheets", response).await?.json().await?;

        let value = range
            .values
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.into_iter().next())
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty());
        Ok(value)
    }

    async fn write_cell(&self, worksheet: &WorksheetRef, cell: &str, value: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let range = a1_range(&worksheet.title, cell);
        let url = self.values_url(&worksheet.spreadsheet_id, &range)?;

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;
        let update: UpdateValuesResponse =
            Self::check("Google Sheets", response).await?.json().await?;

        if let Some(cells) = update.updated_cells {
            if cells > 1 {
                return Err(BotError::processing(format!(
                    "Expected to update one cell but {} were updated ({})",
                    cells,
                    update.updated_range.as_deref().unwrap_or("?")
                )));
            }
        }
        tracing::debug!(
            "Updated range {}",
            update.updated_range.as_deref().unwrap_or(&range)
        );
        Ok(())
    }
}

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::a1::{quote_title, A1Range};
use crate::backend::{SheetsBackend, Spreadsheet, Worksheet};
use crate::error::SheetsError;
use crate::locator::SpreadsheetId;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Written values are parsed as if typed into the UI.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Google Sheets REST v4 client.
///
/// Authentication happens elsewhere: the caller hands in a bearer token and
/// keeps this handle for the life of the process.
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl GoogleSheetsClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            token: token.into(),
        }
    }

    /// Point the client at another endpoint (a proxy or a local fake).
    pub fn with_base_url(mut self, base: &str) -> Result<Self, SheetsError> {
        let url = Url::parse(base).map_err(|_| SheetsError::InvalidBaseUrl(base.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(SheetsError::InvalidBaseUrl(base.to_string()));
        }
        self.base = url;
        Ok(self)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, SheetsError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| SheetsError::Decode(e.to_string()));
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    body
                }
            });
        tracing::debug!(status = status.as_u16(), %message, "sheets API call failed");
        Err(SheetsError::from_status(status.as_u16(), message))
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetDto {
    spreadsheet_id: Option<String>,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetDto>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetDto {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

impl From<SheetProperties> for Worksheet {
    fn from(p: SheetProperties) -> Self {
        Worksheet {
            sheet_id: p.sheet_id,
            title: p.title,
            index: p.index,
            row_count: p.grid_properties.row_count,
            column_count: p.grid_properties.column_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Reply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    add_sheet: Option<AddSheetReply>,
}

#[derive(Debug, Deserialize)]
struct AddSheetReply {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

#[async_trait]
impl SheetsBackend for GoogleSheetsClient {
    async fn open(&self, id: &SpreadsheetId) -> Result<Spreadsheet, SheetsError> {
        let mut url = self.url(&[id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "spreadsheetId,properties.title,sheets.properties");

        let dto: SpreadsheetDto = self.send(self.request(Method::GET, url)).await?;
        let mut worksheets: Vec<Worksheet> =
            dto.sheets.into_iter().map(|s| s.properties.into()).collect();
        worksheets.sort_by_key(|w| w.index);

        Ok(Spreadsheet {
            id: dto.spreadsheet_id.unwrap_or_else(|| id.to_string()),
            title: dto.properties.title,
            worksheets,
        })
    }

    async fn add_worksheet(
        &self,
        id: &SpreadsheetId,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet, SheetsError> {
        let op = format!("{id}:batchUpdate");
        let url = self.url(&[op.as_str()])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": columns }
                    }
                }
            }]
        });

        let resp: BatchUpdateResponse = self.send(self.request(Method::POST, url).json(&body)).await?;
        resp.replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|r| r.properties.into())
            .ok_or_else(|| SheetsError::Decode("batchUpdate reply had no addSheet result".into()))
    }

    async fn get_all_values(
        &self,
        id: &SpreadsheetId,
        worksheet: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let whole_sheet = quote_title(worksheet);
        let url = self.url(&[id.as_str(), "values", whole_sheet.as_str()])?;
        let range: ValueRange = self.send(self.request(Method::GET, url)).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_values(
        &self,
        id: &SpreadsheetId,
        range: &A1Range,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let a1 = range.to_string();
        let mut url = self.url(&[id.as_str(), "values", a1.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", VALUE_INPUT_OPTION);
        let body = json!({ "range": a1, "majorDimension": "ROWS", "values": rows });

        let _: Value = self.send(self.request(Method::PUT, url).json(&body)).await?;
        Ok(())
    }
}

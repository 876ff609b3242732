use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{SupabaseConfig, build_client, error_for_status, transport_error};
use crate::error::{ImageError, ImageResult};
use crate::models::{ImageRecord, NewImageRecord, RecordFilter};
use crate::storage::RecordStore;

const RECORD_COLUMNS: &str = "id,filename,url,embedding";

/// Record store backed by a PostgREST table
pub struct SupabaseRecordStore {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseRecordStore {
    pub fn new(config: SupabaseConfig) -> ImageResult<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url,
            urlencoding::encode(&self.config.table)
        )
    }
}

/// PostgREST horizontal filters for `filter`
fn filter_params(filter: &RecordFilter) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(id) = &filter.id {
        params.push(("id", format!("eq.{}", id)));
    }
    if let Some(filename) = &filter.filename {
        params.push(("filename", format!("eq.{}", filename)));
    }
    params
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    #[instrument(
        skip(self, record),
        fields(table = %self.config.table, filename = %record.filename)
    )]
    async fn insert(&self, record: NewImageRecord) -> ImageResult<ImageRecord> {
        let response = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .query(&[("select", RECORD_COLUMNS)])
            .json(&record)
            .send()
            .await
            .map_err(|e| transport_error("record insert", e))?;

        let rows: Vec<ImageRecord> = error_for_status("record insert", response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error("record insert decode", e))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            ImageError::StoreUnavailable("record insert returned no row".to_string())
        })?;

        debug!(id = %row.id, "Record inserted");
        Ok(row)
    }

    /// Pages with `limit`/`offset` until a short page; PostgREST caps each response.
    #[instrument(skip(self), fields(table = %self.config.table))]
    async fn select(&self, filter: RecordFilter) -> ImageResult<Vec<ImageRecord>> {
        let page_size = self.config.list_page_size;
        let params = filter_params(&filter);
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let response = self
                .client
                .get(self.table_url())
                .query(&[("select", RECORD_COLUMNS), ("order", "id.asc")])
                .query(&params)
                .query(&[("limit", page_size), ("offset", offset)])
                .send()
                .await
                .map_err(|e| transport_error("record select", e))?;

            let page: Vec<ImageRecord> = error_for_status("record select", response)
                .await?
                .json()
                .await
                .map_err(|e| transport_error("record select decode", e))?;

            let fetched = page.len();
            rows.extend(page);

            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        debug!(count = rows.len(), "Records selected");
        Ok(rows)
    }

    /// Refuses an empty filter; PostgREST would otherwise wipe the table.
    #[instrument(skip(self), fields(table = %self.config.table))]
    async fn delete(&self, filter: RecordFilter) -> ImageResult<u64> {
        let params = filter_params(&filter);
        if params.is_empty() {
            return Err(ImageError::Internal(
                "refusing to delete records without a filter".to_string(),
            ));
        }

        let response = self
            .client
            .delete(self.table_url())
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error("record delete", e))?;

        let rows: Vec<serde_json::Value> = error_for_status("record delete", response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error("record delete decode", e))?;

        debug!(count = rows.len(), "Records deleted");
        Ok(rows.len() as u64)
    }

    async fn ping(&self) -> ImageResult<()> {
        let response = self
            .client
            .get(self.table_url())
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| transport_error("record ping", e))?;

        error_for_status("record ping", response).await?;
        Ok(())
    }
}

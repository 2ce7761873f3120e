use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, Method, Response};
use serde_json::{json, Value};
use std::time::Duration;

use super::{decode_records, Fetcher, RemoteWriter, ResourceDescriptor};
use crate::error::ErrorInfo;
use crate::record::{Record, RecordId};

/// Detection backend over plain REST/JSON
pub struct HttpBackend {
    base_url: String,
    http_client: HttpClient,
    write_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, write_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: HttpClient::new(),
            write_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send_write(&self, method: Method, path: &str, body: Value) -> Result<Option<Record>, ErrorInfo> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let resp = self
            .http_client
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.write_timeout)
            .json(&body)
            .send()
            .await?;

        let body = checked_body(resp, true).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(Some(Record::from_map(map))),
            // Acknowledgement without a record, e.g. a bare message string
            _ => Ok(None),
        }
    }
}

/// Read the body, turning non-2xx into a typed status error
async fn checked_body(resp: Response, write: bool) -> Result<String, ErrorInfo> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ErrorInfo::from_status(status.as_u16(), &body, write));
    }
    Ok(body)
}

#[async_trait]
impl Fetcher for HttpBackend {
    async fn fetch(&self, resource: &ResourceDescriptor) -> Result<Vec<Record>, ErrorInfo> {
        let url = self.url(&resource.path);

        let resp = self
            .http_client
            .get(&url)
            .query(&resource.query)
            .timeout(resource.timeout)
            .send()
            .await?;

        let body = checked_body(resp, false).await?;
        let value: Value = serde_json::from_str(&body)?;
        let records = decode_records(value)?;
        tracing::debug!("GET {} -> {} records", url, records.len());
        Ok(records)
    }
}

#[async_trait]
impl RemoteWriter for HttpBackend {
    async fn delete(&self, path: &str, id: &RecordId) -> Result<(), ErrorInfo> {
        self.send_write(Method::DELETE, path, json!({ "id": id.to_value() }))
            .await
            .map(|_| ())
    }

    async fn create(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo> {
        self.send_write(Method::POST, path, payload.clone().into_value())
            .await
    }

    async fn update(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo> {
        self.send_write(Method::PUT, path, payload.clone().into_value())
            .await
    }
}

use reqwest::Client as HttpClient;
use serde_json::Value;
use std::future::Future;
use url::Url;

use crate::api::models::{Ack, ContactRecord, ListEnvelope};
use crate::error::ApiError;
use crate::form::ContactSubmission;

/// The slice of the API `NotificationSync::initialize` needs.
pub trait FormSource {
    fn fetch_forms(&self) -> impl Future<Output = Result<Vec<ContactRecord>, ApiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn forms_endpoint(&self) -> String {
        format!("{}/form", self.base_url)
    }

    /// `GET /form`. Any shape other than `{ success: true, data: [...] }`
    /// is a failure; nothing is partially parsed.
    pub async fn list_forms(&self) -> Result<Vec<ContactRecord>, ApiError> {
        let endpoint = self.forms_endpoint();
        log::debug!("fetching contact list from {endpoint}");
        let resp = self.http.get(&endpoint).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ApiError::Status { status, message: format!("Error del servidor: {status}") });
        }
        let envelope: ListEnvelope = resp
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        envelope.into_records()
    }

    /// `POST /form`. Returns the server's confirmation message, if any.
    pub async fn submit_form(&self, submission: &ContactSubmission) -> Result<Option<String>, ApiError> {
        let endpoint = self.forms_endpoint();
        log::info!("submitting contact form to {endpoint}");
        let resp = self.http.post(&endpoint).json(submission).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // The backend usually explains itself in `message`.
            let message = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("Error del servidor: {}", status.as_u16()));
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        let ack: Ack = resp.json().await.map_err(|e| ApiError::Malformed(e.to_string()))?;
        if ack.success {
            Ok(ack.message)
        } else {
            Err(ApiError::Rejected(ack.message.unwrap_or_else(|| "Error en el servidor".into())))
        }
    }

    /// `/form/{id}` with `id` encoded as a single path segment.
    fn form_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.forms_endpoint()).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        Ok(url)
    }

    pub async fn delete_form(&self, id: &str) -> Result<(), ApiError> {
        let endpoint = self.form_url(id)?;
        log::info!("deleting contact {id}");
        let resp = self.http.delete(endpoint).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ApiError::Status { status, message: format!("Error del servidor: {status}") });
        }
        let ack: Ack = resp.json().await.map_err(|e| ApiError::Malformed(e.to_string()))?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(ack.message.unwrap_or_else(|| "Error al eliminar el contacto".into())))
        }
    }
}

impl FormSource for ApiClient {
    fn fetch_forms(&self) -> impl Future<Output = Result<Vec<ContactRecord>, ApiError>> + Send {
        self.list_forms()
    }
}

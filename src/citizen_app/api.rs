/**
 * Incident API Client
 *
 * HTTP transport for incident reports: posts the declaration form the
 * backend expects and maps its responses onto `SubmitError`.
 */
use crate::citizen_app::config::Config;
use crate::citizen_app::offline::attachment::{DEFAULT_CONTENT_TYPE, DEFAULT_FILE_NAME};
use crate::citizen_app::offline::Attachment;
use crate::citizen_app::sync::{SubmitError, Submitter};
use crate::shared::IncidentPayload;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// Endpoint receiving citizen declarations
pub const INCIDENTS_PATH: &str = "/citoyens/incidents";

/// Submits incident reports to the backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpSubmitter {
    pub fn new(config: &Config) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SubmitError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.api_url(INCIDENTS_PATH),
            token: config.get_token().map(str::to_string),
        })
    }

    /// Endpoint this submitter posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(payload: &IncidentPayload, photo: Option<Attachment>) -> Result<Form, SubmitError> {
        let data = serde_json::to_string(payload)
            .map_err(|e| SubmitError::Other(format!("Failed to serialize incident: {}", e)))?;
        let data = Part::text(data)
            .mime_str("application/json")
            .map_err(|e| SubmitError::Other(e.to_string()))?;

        let mut form = Form::new().part("data", data);

        if let Some(photo) = photo {
            let file_name = if photo.file_name.is_empty() {
                DEFAULT_FILE_NAME.to_string()
            } else {
                photo.file_name
            };
            let content_type = if photo.content_type.is_empty() {
                DEFAULT_CONTENT_TYPE
            } else {
                photo.content_type.as_str()
            };
            let part = Part::bytes(photo.data)
                .file_name(file_name)
                .mime_str(content_type)
                .map_err(|e| SubmitError::Other(format!("Invalid photo content type: {}", e)))?;
            form = form.part("photo", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        payload: &IncidentPayload,
        photo: Option<Attachment>,
    ) -> Result<(), SubmitError> {
        let form = Self::form(payload, photo)?;

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| status.to_string());
            tracing::debug!("Backend answered {}: {}", status, error_text);
            return Err(SubmitError::from_status(status.as_u16(), error_text));
        }

        tracing::debug!("Incident '{}' accepted ({})", payload.title, status);
        Ok(())
    }
}

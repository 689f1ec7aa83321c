/**
 * Incident Report Payload
 *
 * This module defines the business fields of a citizen incident report
 * and the client-side validation applied before a report is sent or queued.
 *
 * The JSON field names follow the backend's incident request contract, so a
 * payload can be posted as-is in the `data` part of the declaration form.
 */
use crate::shared::error::SharedError;
use serde::{Deserialize, Serialize};

/// Minimum title length accepted by the declaration form
pub const TITLE_MIN_LEN: usize = 5;
/// Maximum title length accepted by the declaration form
pub const TITLE_MAX_LEN: usize = 100;
/// Minimum description length accepted by the declaration form
pub const DESCRIPTION_MIN_LEN: usize = 20;

/// A citizen-reported municipal problem awaiting delivery to the backend
///
/// The offline queue treats this value as opaque: it is stored and
/// forwarded to the submit function without inspection.
///
/// # Example
/// ```rust
/// use geoinfo::shared::IncidentPayload;
///
/// let payload = IncidentPayload::new(
///     "Broken street light",
///     "The light at the corner has been off for a week now.",
///     "ECLAIRAGE",
///     33.5731,
///     -7.5898,
///     4,
///     "3f2b8c1e-8d4b-4a55-9d0e-1b2c3d4e5f60",
/// );
/// assert!(payload.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPayload {
    /// Short title shown in incident lists
    #[serde(rename = "titre")]
    pub title: String,
    /// Free-text description of the problem
    pub description: String,
    /// Incident category (pothole, lighting, sanitation…)
    #[serde(rename = "typeIncident")]
    pub category: String,
    /// WGS84 latitude
    pub latitude: f64,
    /// WGS84 longitude
    pub longitude: f64,
    /// Sector responsible for this category of incident
    #[serde(rename = "secteurId")]
    pub sector_id: i64,
    /// Province the incident is located in, when known
    #[serde(rename = "provinceId", skip_serializing_if = "Option::is_none", default)]
    pub province_id: Option<i64>,
    /// Anonymous identifier of the reporting device
    #[serde(rename = "deviceId")]
    pub reporter_id: String,
    /// Name of the place (shop, building…)
    #[serde(rename = "nomLocal", skip_serializing_if = "Option::is_none", default)]
    pub place_name: Option<String>,
    /// Street address or free-form location
    #[serde(rename = "localisation", skip_serializing_if = "Option::is_none", default)]
    pub address: Option<String>,
    /// Optional e-mail used to recover reports across devices
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub citizen_email: Option<String>,
}

impl IncidentPayload {
    /// Create a payload with the mandatory fields set
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        latitude: f64,
        longitude: f64,
        sector_id: i64,
        reporter_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: category.into(),
            latitude,
            longitude,
            sector_id,
            province_id: None,
            reporter_id: reporter_id.into(),
            place_name: None,
            address: None,
            citizen_email: None,
        }
    }

    /// Set the province
    pub fn with_province(mut self, province_id: i64) -> Self {
        self.province_id = Some(province_id);
        self
    }

    /// Set the place name and address
    pub fn with_location(mut self, place_name: impl Into<String>, address: impl Into<String>) -> Self {
        self.place_name = Some(place_name.into());
        self.address = Some(address.into());
        self
    }

    /// Validate the payload with the declaration form rules
    ///
    /// Returns the first failing field. Lengths are counted in characters,
    /// not bytes.
    pub fn validate(&self) -> Result<(), SharedError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err(SharedError::validation("title", "Title is required"));
        }
        if title_len < TITLE_MIN_LEN {
            return Err(SharedError::validation(
                "title",
                format!("Title must contain at least {} characters", TITLE_MIN_LEN),
            ));
        }
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(SharedError::validation(
                "title",
                format!("Title cannot exceed {} characters", TITLE_MAX_LEN),
            ));
        }

        let description_len = self.description.trim().chars().count();
        if description_len == 0 {
            return Err(SharedError::validation("description", "Description is required"));
        }
        if description_len < DESCRIPTION_MIN_LEN {
            return Err(SharedError::validation(
                "description",
                format!("Description must contain at least {} characters", DESCRIPTION_MIN_LEN),
            ));
        }

        if self.category.trim().is_empty() {
            return Err(SharedError::validation("category", "Incident category is required"));
        }
        if self.sector_id <= 0 {
            return Err(SharedError::validation("sector_id", "Sector is required"));
        }
        if self.reporter_id.trim().is_empty() {
            return Err(SharedError::validation("reporter_id", "Reporter identifier is required"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SharedError::validation("latitude", "Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SharedError::validation("longitude", "Longitude must be between -180 and 180"));
        }

        Ok(())
    }
}

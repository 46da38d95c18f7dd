use crate::error::WorkflowError;
use crate::types::{
    RecognitionResult, SaveOutcome, SelectedImage, StoredVehicle, VehicleDetails,
};
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

pub const UPLOAD_IMAGE_PATH: &str = "api/upload_image";
pub const SAVE_VEHICLE_PATH: &str = "api/guardar_vehiculo";
pub const LIST_VEHICLES_PATH: &str = "api/vehiculos";

/// Talks to the workshop backend. Every call is a single request with no
/// retry and no timeout.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    pub fn new(base: Url) -> Self {
        Client {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// Builds a client for `http://{host}/`.
    pub fn for_host(host: &str) -> Result<Self, failure::Error> {
        let base = Url::parse(&format!("http://{}/", host))
            .map_err(|e| format_err!("Bad WORKSHOP_HOST {:?}: {}", host, e))?;
        Ok(Client::new(base))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, WorkflowError> {
        self.base
            .join(path)
            .map_err(|e| WorkflowError::Transport(format!("Bad endpoint {}: {}", path, e)))
    }

    pub async fn recognize(&self, image: &SelectedImage) -> Result<RecognitionResult, WorkflowError> {
        let url = self.endpoint(UPLOAD_IMAGE_PATH)?;
        info!("Uploading {} ({} bytes) to {}", image.name, image.bytes.len(), url);
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.name.clone())
            .mime_str(&image.mime)?;
        let body: Value = self
            .http
            .post(url)
            .multipart(Form::new().part("image", part))
            .send()
            .await?
            .json()
            .await?;
        debug!("Recognition response: {}", body);
        Ok(RecognitionResult::from_json(&body)?)
    }

    pub async fn save_vehicle(
        &self,
        plate: &str,
        details: &VehicleDetails,
    ) -> Result<SaveOutcome, WorkflowError> {
        let url = self.endpoint(SAVE_VEHICLE_PATH)?;
        info!("Saving vehicle {} to {}", plate, url);
        let body: Value = self
            .http
            .post(url)
            .json(&details.to_json(plate))
            .send()
            .await?
            .json()
            .await?;
        debug!("Save response: {}", body);
        Ok(SaveOutcome::from_json(&body)?)
    }

    pub async fn list_vehicles(&self) -> Result<Vec<StoredVehicle>, WorkflowError> {
        let url = self.endpoint(LIST_VEHICLES_PATH)?;
        info!("Listing vehicles from {}", url);
        let body: Value = self.http.get(url).send().await?.json().await?;
        Ok(StoredVehicle::list_from_json(&body)?)
    }
}

use failure::Error;
use mime_guess::mime;
use serde_json::Value;
use std::path::Path;

/// Rendered when the backend reports a failure without saying why.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// The image chosen by the user; only lives until the next selection or a reset.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SelectedImage {
    /// The declared MIME type is stored trimmed and lowercased, which is the
    /// form it gets validated, previewed and uploaded in.
    pub fn new(name: impl Into<String>, mime: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        SelectedImage {
            name: name.into(),
            mime: mime.as_ref().trim().to_ascii_lowercase(),
            bytes,
        }
    }

    /// Reads a file from disk, declaring the MIME type its extension implies.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        Ok(SelectedImage::new(name, mime, bytes))
    }

    /// Whether the declared MIME type belongs to the image family.
    pub fn is_image(&self) -> bool {
        match self.mime.parse::<mime::Mime>() {
            Ok(m) => m.type_() == mime::IMAGE,
            Err(_) => false,
        }
    }
}

/// A vehicle already on file, as the recognition endpoint returns it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleRecord {
    pub owner_name: String,
    pub vehicle_description: String,
    pub fault_description: String,
    pub owner_email: String,
    pub status: String,
}

impl VehicleRecord {
    fn from_json(value: &Value) -> Self {
        VehicleRecord {
            owner_name: text(&value["duenio"]),
            vehicle_description: text(&value["vehiculo"]),
            fault_description: text(&value["falla"]),
            owner_email: text(&value["email"]),
            status: text(&value["estado"]),
        }
    }
}

/// The fields the user types into the new-vehicle form. The plate comes
/// from the form itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleDetails {
    pub owner_name: String,
    pub vehicle_description: String,
    pub fault_description: String,
    pub owner_email: String,
}

impl VehicleDetails {
    pub fn to_json(&self, plate: &str) -> Value {
        serde_json::json!({
            "patente": plate,
            "duenio": self.owner_name,
            "vehiculo": self.vehicle_description,
            "falla": self.fault_description,
            "email": self.owner_email,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    Failure(String),
    NoPlateDetected,
    KnownVehicle { plate: String, record: VehicleRecord },
    NewVehicle(String),
}

impl RecognitionResult {
    /// Interprets an `/api/upload_image` response body.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let success = value["success"]
            .as_bool()
            .ok_or_else(|| format_err!("Missing success field in response {}", value))?;
        if !success {
            return Ok(RecognitionResult::Failure(
                value["error"].as_str().unwrap_or(UNKNOWN_ERROR).to_string(),
            ));
        }
        let plate = match value["patente"].as_str() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Ok(RecognitionResult::NoPlateDetected),
        };
        if !value["existe"].as_bool().unwrap_or(false) {
            return Ok(RecognitionResult::NewVehicle(plate));
        }
        let vehicle = &value["vehiculo"];
        if !vehicle.is_object() {
            bail!("Missing vehiculo for known plate {}", plate);
        }
        Ok(RecognitionResult::KnownVehicle {
            plate,
            record: VehicleRecord::from_json(vehicle),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Rejected(String),
}

impl SaveOutcome {
    /// Interprets an `/api/guardar_vehiculo` response body.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let success = value["success"]
            .as_bool()
            .ok_or_else(|| format_err!("Missing success field in response {}", value))?;
        if success {
            Ok(SaveOutcome::Saved)
        } else {
            Ok(SaveOutcome::Rejected(
                value["error"].as_str().unwrap_or(UNKNOWN_ERROR).to_string(),
            ))
        }
    }
}

/// A row from the workshop's vehicle listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVehicle {
    pub id: i64,
    pub plate: String,
    pub record: VehicleRecord,
    pub intake_date: String,
}

impl StoredVehicle {
    /// Interprets an `/api/vehiculos` response body.
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>, Error> {
        let rows = value
            .as_array()
            .ok_or_else(|| format_err!("Expected an array of vehicles, got {}", value))?;
        rows.iter()
            .map(|row| -> Result<Self, Error> {
                Ok(StoredVehicle {
                    id: row["id"]
                        .as_i64()
                        .ok_or_else(|| format_err!("Missing id field in {}", row))?,
                    plate: row["patente"]
                        .as_str()
                        .ok_or_else(|| format_err!("Missing patente field in {}", row))?
                        .to_string(),
                    record: VehicleRecord::from_json(row),
                    intake_date: text(&row["fecha_ingreso"]),
                })
            })
            .collect()
    }
}

// Absent and null fields render as empty text.
fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

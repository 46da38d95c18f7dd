#[macro_use]
extern crate failure;

pub mod client;
pub mod error;
pub mod preview;
pub mod types;
pub mod workflow;

pub use client::Client;
pub use error::WorkflowError;
pub use types::{
    RecognitionResult, SaveOutcome, SelectedImage, StoredVehicle, VehicleDetails, VehicleRecord,
};
pub use workflow::{Page, ResultPanel, State, UploadWorkflow};

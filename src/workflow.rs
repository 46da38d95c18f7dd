//! The upload workflow: select an image, send it for plate recognition,
//! show what came back and, for an unknown plate, register the vehicle.

use crate::client::Client;
use crate::error::WorkflowError;
use crate::preview::{self, Preview};
use crate::types::{RecognitionResult, SaveOutcome, SelectedImage, VehicleDetails, VehicleRecord};
use log::{debug, error, info, warn};

pub const CONNECTION_ERROR: &str = "Connection error";
pub const SAVED_NOTICE: &str = "Vehicle saved";
pub const NO_PLATE_TIPS: [&str; 3] = [
    "Good lighting",
    "Sharp focus",
    "Whole plate inside the frame",
];

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Idle,
    ImageSelected,
    Submitting,
    Failed(String),
    NoPlate,
    KnownVehicleShown,
    NewVehicleFormShown,
    SubmittingRegistration,
}

/// What the result area says.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPanel {
    Empty,
    ReadyToProcess,
    Error(String),
    NoPlate { tips: Vec<String> },
    Registered { plate: String },
    NewVehicle { plate: String },
}

/// Everything the user can see. A reset puts it back to `Page::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub file_name: Option<String>,
    pub preview: Option<Preview>,
    pub process_enabled: bool,
    pub loading: bool,
    pub result: ResultPanel,
    pub vehicle_info: Option<VehicleRecord>,
    /// Plate field of the new-vehicle form; `None` while the form is hidden.
    pub form_plate: Option<String>,
    /// Last alert-style message.
    pub notice: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            file_name: None,
            preview: None,
            process_enabled: false,
            loading: false,
            result: ResultPanel::Empty,
            vehicle_info: None,
            form_plate: None,
            notice: None,
        }
    }
}

pub struct UploadWorkflow {
    client: Client,
    state: State,
    selected: Option<SelectedImage>,
    last_result: Option<RecognitionResult>,
    active_plate: Option<String>,
    page: Page,
}

impl UploadWorkflow {
    pub fn new(client: Client) -> Self {
        UploadWorkflow {
            client,
            state: State::Idle,
            selected: None,
            last_result: None,
            active_plate: None,
            page: Page::default(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn last_result(&self) -> Option<&RecognitionResult> {
        self.last_result.as_ref()
    }

    pub fn active_plate(&self) -> Option<&str> {
        self.active_plate.as_deref()
    }

    fn transition(&mut self, next: State) {
        debug!("Workflow {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Handles a pick or a drop. Only the first file counts.
    pub fn select_files<I>(&mut self, files: I) -> Result<(), WorkflowError>
    where
        I: IntoIterator<Item = SelectedImage>,
    {
        match files.into_iter().next() {
            Some(file) => self.select_image(file),
            None => Ok(()),
        }
    }

    pub fn select_image(&mut self, file: SelectedImage) -> Result<(), WorkflowError> {
        if self.is_busy() {
            warn!("Ignoring selection of {} while a request is in flight", file.name);
            return Ok(());
        }
        if !file.is_image() {
            let e = WorkflowError::Validation {
                mime: file.mime.clone(),
            };
            self.page.notice = Some(e.to_string());
            return Err(e);
        }
        info!("Selected {} ({})", file.name, file.mime);
        self.clear_result();
        self.page.file_name = Some(file.name.clone());
        self.page.preview = Some(preview::render(&file));
        self.page.process_enabled = true;
        self.page.result = ResultPanel::ReadyToProcess;
        self.selected = Some(file);
        self.transition(State::ImageSelected);
        Ok(())
    }

    /// Forgets the last recognition outcome and everything shown for it.
    fn clear_result(&mut self) {
        self.last_result = None;
        self.active_plate = None;
        self.page.vehicle_info = None;
        self.page.form_plate = None;
    }

    fn is_busy(&self) -> bool {
        matches!(self.state, State::Submitting | State::SubmittingRegistration)
    }

    /// Sends the selected image to the recognition endpoint and projects the
    /// answer onto the page. Outcome errors are rendered, not returned.
    pub async fn submit_for_recognition(&mut self) -> Result<&State, WorkflowError> {
        if self.is_busy() {
            debug!("Request already in flight");
            return Ok(&self.state);
        }
        let image = match &self.selected {
            Some(image) => image.clone(),
            None => {
                let e = WorkflowError::NoImageSelected;
                self.page.notice = Some(e.to_string());
                return Err(e);
            }
        };

        self.transition(State::Submitting);
        self.page.process_enabled = false;
        self.page.loading = true;
        self.clear_result();

        let outcome = self.client.recognize(&image).await;

        self.page.process_enabled = true;
        self.page.loading = false;

        match outcome {
            Ok(result) => self.show_result(result),
            Err(e) => {
                error!("Error uploading image: {}", e);
                self.page.result = ResultPanel::Error(CONNECTION_ERROR.to_string());
                self.transition(State::Failed(CONNECTION_ERROR.to_string()));
            }
        }
        Ok(&self.state)
    }

    fn show_result(&mut self, result: RecognitionResult) {
        self.clear_result();
        match &result {
            RecognitionResult::Failure(message) => {
                let shown = WorkflowError::Application(message.clone()).to_string();
                self.page.result = ResultPanel::Error(shown.clone());
                self.transition(State::Failed(shown));
            }
            RecognitionResult::NoPlateDetected => {
                self.page.result = ResultPanel::NoPlate {
                    tips: NO_PLATE_TIPS.iter().map(|t| t.to_string()).collect(),
                };
                self.transition(State::NoPlate);
            }
            RecognitionResult::KnownVehicle { plate, record } => {
                info!("Plate {} is already registered", plate);
                self.active_plate = Some(plate.clone());
                self.page.form_plate = None;
                self.page.vehicle_info = Some(record.clone());
                self.page.result = ResultPanel::Registered {
                    plate: plate.clone(),
                };
                self.transition(State::KnownVehicleShown);
            }
            RecognitionResult::NewVehicle(plate) => {
                info!("Plate {} is new", plate);
                self.active_plate = Some(plate.clone());
                self.page.vehicle_info = None;
                self.page.form_plate = Some(plate.clone());
                self.page.result = ResultPanel::NewVehicle {
                    plate: plate.clone(),
                };
                self.transition(State::NewVehicleFormShown);
            }
        }
        self.last_result = Some(result);
    }

    /// Saves a new vehicle under the plate shown in the form. On success the
    /// whole workflow starts over; on failure the form stays as it was.
    pub async fn submit_registration(
        &mut self,
        details: VehicleDetails,
    ) -> Result<&State, WorkflowError> {
        if self.is_busy() {
            debug!("Request already in flight");
            return Ok(&self.state);
        }
        let plate = match (&self.state, &self.active_plate, &self.page.form_plate) {
            (State::NewVehicleFormShown, Some(_), Some(plate)) => plate.clone(),
            _ => {
                let e = WorkflowError::FormNotShown;
                self.page.notice = Some(e.to_string());
                return Err(e);
            }
        };

        self.transition(State::SubmittingRegistration);
        let outcome = self.client.save_vehicle(&plate, &details).await;

        match outcome {
            Ok(SaveOutcome::Saved) => {
                info!("Vehicle {} saved", plate);
                self.reset();
                self.page.notice = Some(SAVED_NOTICE.to_string());
            }
            Ok(SaveOutcome::Rejected(message)) => {
                warn!("Backend rejected vehicle {}: {}", plate, message);
                self.page.notice = Some(WorkflowError::Application(message).to_string());
                self.transition(State::NewVehicleFormShown);
            }
            Err(e) => {
                error!("Error saving vehicle: {}", e);
                self.page.notice = Some(CONNECTION_ERROR.to_string());
                self.transition(State::NewVehicleFormShown);
            }
        }
        Ok(&self.state)
    }

    /// Drops every piece of transient state.
    pub fn reset(&mut self) {
        self.selected = None;
        self.last_result = None;
        self.active_plate = None;
        self.page = Page::default();
        self.transition(State::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn unreachable_client() -> Client {
        // None of these tests get as far as the network.
        Client::new(Url::parse("http://127.0.0.1:9/").unwrap())
    }

    fn jpeg() -> SelectedImage {
        SelectedImage::new("car.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    #[test]
    fn non_image_leaves_state_untouched() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        let err = workflow
            .select_image(SelectedImage::new("notes.txt", "text/plain", b"hi".to_vec()))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Validation {
                mime: "text/plain".into()
            }
        );
        assert_eq!(workflow.state(), &State::Idle);
        assert!(workflow.selected_image().is_none());
        assert!(!workflow.page().process_enabled);

        workflow.select_image(jpeg()).unwrap();
        let _ = workflow.select_image(SelectedImage::new("a.pdf", "application/pdf", vec![1]));
        assert_eq!(workflow.state(), &State::ImageSelected);
        assert_eq!(workflow.selected_image(), Some(&jpeg()));
    }

    #[test]
    fn image_is_stored_and_previewed() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        assert_eq!(workflow.state(), &State::ImageSelected);
        assert_eq!(workflow.selected_image(), Some(&jpeg()));
        assert!(workflow.page().process_enabled);
        assert_eq!(workflow.page().file_name.as_deref(), Some("car.jpg"));
        assert!(workflow.page().preview.is_some());
        assert_eq!(workflow.page().result, ResultPanel::ReadyToProcess);
    }

    #[test]
    fn only_first_file_of_a_drop_is_used() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        let second = SelectedImage::new("other.png", "image/png", vec![1, 2]);
        workflow.select_files(vec![jpeg(), second]).unwrap();
        assert_eq!(workflow.selected_image(), Some(&jpeg()));

        workflow.select_files(Vec::new()).unwrap();
        assert_eq!(workflow.selected_image(), Some(&jpeg()));
    }

    #[tokio::test]
    async fn submitting_twice_is_a_no_op() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        // `&mut self` rules out a second call while one is awaited, so the
        // in-flight state is set by hand.
        workflow.state = State::Submitting;
        workflow.page.process_enabled = false;
        workflow.page.loading = true;

        let state = workflow.submit_for_recognition().await.unwrap().clone();
        assert_eq!(state, State::Submitting);
        assert!(workflow.page().loading);
        assert_eq!(workflow.page().result, ResultPanel::ReadyToProcess);
    }

    #[tokio::test]
    async fn submitting_without_image_is_refused() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        let err = workflow.submit_for_recognition().await.unwrap_err();
        assert_eq!(err, WorkflowError::NoImageSelected);
        assert_eq!(workflow.state(), &State::Idle);
    }

    #[tokio::test]
    async fn registration_needs_the_new_vehicle_form() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        let err = workflow
            .submit_registration(VehicleDetails::default())
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::FormNotShown);
        assert_eq!(workflow.state(), &State::ImageSelected);
    }

    #[test]
    fn new_vehicle_result_fills_form() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        workflow.show_result(RecognitionResult::NewVehicle("ABC123".into()));
        assert_eq!(workflow.state(), &State::NewVehicleFormShown);
        assert_eq!(workflow.page().form_plate.as_deref(), Some("ABC123"));
        assert_eq!(workflow.active_plate(), Some("ABC123"));
        assert!(workflow.page().vehicle_info.is_none());
    }

    #[tokio::test]
    async fn new_selection_drops_the_open_form() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        workflow.show_result(RecognitionResult::NewVehicle("ABC123".into()));

        workflow
            .select_image(SelectedImage::new("b.jpg", "image/jpeg", vec![1]))
            .unwrap();
        assert_eq!(workflow.state(), &State::ImageSelected);
        assert_eq!(workflow.page().form_plate, None);
        assert_eq!(workflow.active_plate(), None);
        assert!(workflow.last_result().is_none());
        assert_eq!(
            workflow.submit_registration(VehicleDetails::default()).await.unwrap_err(),
            WorkflowError::FormNotShown
        );
    }

    #[test]
    fn no_plate_after_new_vehicle_hides_the_form() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        workflow.show_result(RecognitionResult::NewVehicle("ABC123".into()));
        workflow.show_result(RecognitionResult::NoPlateDetected);
        assert_eq!(workflow.state(), &State::NoPlate);
        assert_eq!(workflow.page().form_plate, None);
        assert_eq!(workflow.active_plate(), None);
        assert!(workflow.page().vehicle_info.is_none());
    }

    #[test]
    fn reset_discards_everything() {
        let mut workflow = UploadWorkflow::new(unreachable_client());
        workflow.select_image(jpeg()).unwrap();
        workflow.show_result(RecognitionResult::NewVehicle("ABC123".into()));
        workflow.reset();
        assert_eq!(workflow.state(), &State::Idle);
        assert!(workflow.selected_image().is_none());
        assert!(workflow.last_result().is_none());
        assert!(workflow.active_plate().is_none());
        assert_eq!(workflow.page(), &Page::default());
    }
}

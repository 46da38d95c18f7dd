#[derive(Debug, Fail, PartialEq)]
pub enum WorkflowError {
    #[fail(display = "Not an image file ({}); choose a JPEG, PNG, etc.", mime)]
    Validation { mime: String },
    #[fail(display = "Connection error: {}", _0)]
    Transport(String),
    #[fail(display = "Error: {}", _0)]
    Application(String),
    #[fail(display = "Select an image first")]
    NoImageSelected,
    #[fail(display = "No new-vehicle form is open")]
    FormNotShown,
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        WorkflowError::Transport(e.to_string())
    }
}

impl From<failure::Error> for WorkflowError {
    fn from(e: failure::Error) -> Self {
        WorkflowError::Transport(e.to_string())
    }
}

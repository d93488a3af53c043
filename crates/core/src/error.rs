use thiserror::Error;

use crate::model::QuestionError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

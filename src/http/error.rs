use std::fmt::Display;

use rouille::Response;

use crate::{engine::error::EngineError, storage::error::StorageError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TrackNotFound(id) => {
                ApiError::NotFound(format!("track {} not found", id))
            }

            StorageError::Database(_)
            | StorageError::MalformedTrack { .. }
            | StorageError::Internal(_) => {
                log::error!("Storage failure while serving request: {err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidMoodProfile(mood) => {
                ApiError::BadRequest(format!("unknown mood profile '{mood}'"))
            }
            EngineError::Store(e) => ApiError::from(e),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Internal(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::text(self.to_string()).with_status_code(status)
    }
}

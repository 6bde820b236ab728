use chrono::{DateTime, Utc};
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;

use crate::{
    config::HttpConfig,
    domain::{id::TrackId, mood::FeatureRange, playlist::Playlist},
    engine::RecommendationEngine,
    http::error::ApiError,
    storage::{error::StorageError, operations::Storage},
};

pub type SharedStorage = Arc<Mutex<Storage>>;

pub struct HttpServer {
    engine: RecommendationEngine<SharedStorage>,
    storage: SharedStorage,
    pub config: HttpConfig,
}

impl HttpServer {
    /// `engine` must read from the same `storage` the server uses for
    /// single-track lookups.
    pub fn new(
        engine: RecommendationEngine<SharedStorage>,
        storage: SharedStorage,
        config: HttpConfig,
    ) -> Self {
        Self {
            engine,
            storage,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/moods) => {
                self.handle_list_moods()
            },
            (GET) (/moods/{mood: String}/playlist) => {
                self.handle_playlist(mood, request)
            },
            (GET) (/tracks/{id: String}) => {
                self.handle_get_track(id)
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn handle_list_moods(&self) -> Response {
        let moods = self
            .engine
            .taxonomy()
            .iter()
            .map(|(id, profile)| MoodResponse {
                id: id.to_string(),
                required_moods: profile.required_moods.iter().cloned().collect(),
                audio_features: profile.audio_features.clone(),
            })
            .collect::<Vec<_>>();
        Response::json(&moods)
    }

    fn playlist(&self, mood: String, request: &Request) -> Result<Response, ApiError> {
        let user_id = request
            .get_param("user")
            .filter(|user| !user.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("missing user id".into()))?;

        let tracks = self.engine.generate(&user_id, &mood)?;

        Ok(Response::json(&PlaylistResponse {
            user_id,
            mood_id: mood,
            generated_at: Utc::now(),
            tracks,
        }))
    }

    fn handle_playlist(&self, mood: String, request: &Request) -> Response {
        match self.playlist(mood, request) {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }

    /// returns Response with ok status, or ApiError
    fn get_track(&self, id: String) -> Result<Response, ApiError> {
        let track_id =
            TrackId::parse(&id).map_err(|_| ApiError::BadRequest("invalid track id".into()))?;

        let storage = self.storage.lock().map_err(|e| {
            StorageError::Internal(anyhow!("Could not access track store under lock: {e}"))
        })?;
        let track = storage.get_track(&track_id)?;

        Ok(Response::json(&track))
    }

    fn handle_get_track(&self, id: String) -> Response {
        match self.get_track(id) {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct MoodResponse {
    id: String,
    required_moods: Vec<String>,
    audio_features: BTreeMap<String, FeatureRange>,
}

#[derive(Serialize, Deserialize)]
struct PlaylistResponse {
    user_id: String,
    mood_id: String,
    generated_at: DateTime<Utc>,
    tracks: Playlist,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

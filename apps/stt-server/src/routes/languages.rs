use axum::Json;
use serde::Serialize;
use stt_queue::languages::{Language, SUPPORTED_LANGUAGES};

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
	pub languages: &'static [Language],
	pub count: usize,
}

pub async fn list() -> Json<LanguagesResponse> {
	Json(LanguagesResponse {
		languages: SUPPORTED_LANGUAGES,
		count: SUPPORTED_LANGUAGES.len(),
	})
}

use serde::Serialize;

/// One recognizer-supported language.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Language {
	pub code: &'static str,
	pub name: &'static str,
}

/// Languages the recognition backend accepts, ISO 639-1 codes.
pub const SUPPORTED_LANGUAGES: &[Language] = &[
	Language { code: "ar", name: "Arabic" },
	Language { code: "ca", name: "Catalan" },
	Language { code: "cs", name: "Czech" },
	Language { code: "da", name: "Danish" },
	Language { code: "de", name: "German" },
	Language { code: "el", name: "Greek" },
	Language { code: "en", name: "English" },
	Language { code: "es", name: "Spanish" },
	Language { code: "fi", name: "Finnish" },
	Language { code: "fr", name: "French" },
	Language { code: "he", name: "Hebrew" },
	Language { code: "hi", name: "Hindi" },
	Language { code: "hu", name: "Hungarian" },
	Language { code: "id", name: "Indonesian" },
	Language { code: "it", name: "Italian" },
	Language { code: "ja", name: "Japanese" },
	Language { code: "ko", name: "Korean" },
	Language { code: "ms", name: "Malay" },
	Language { code: "nl", name: "Dutch" },
	Language { code: "no", name: "Norwegian" },
	Language { code: "pl", name: "Polish" },
	Language { code: "pt", name: "Portuguese" },
	Language { code: "ro", name: "Romanian" },
	Language { code: "ru", name: "Russian" },
	Language { code: "sv", name: "Swedish" },
	Language { code: "th", name: "Thai" },
	Language { code: "tr", name: "Turkish" },
	Language { code: "uk", name: "Ukrainian" },
	Language { code: "vi", name: "Vietnamese" },
	Language { code: "zh", name: "Chinese" },
];

/// Whether the recognizer accepts `code`.
#[must_use]
pub fn is_supported(code: &str) -> bool {
	let lowered = code.to_lowercase();
	SUPPORTED_LANGUAGES.iter().any(|language| language.code == lowered)
}

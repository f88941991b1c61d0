//! Display and content languages served by the site family.

use serde::{Deserialize, Serialize};

/// A language a site can be displayed in or filter its content by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hindi,
    Gujarati,
    Tamil,
    Marathi,
    Malayalam,
    Bengali,
    Telugu,
    Kannada,
    English,
}

impl Language {
    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Hindi => "hi",
            Language::Gujarati => "gu",
            Language::Tamil => "ta",
            Language::Marathi => "mr",
            Language::Malayalam => "ml",
            Language::Bengali => "bn",
            Language::Telugu => "te",
            Language::Kannada => "kn",
            Language::English => "en",
        }
    }

    /// Name of the language written in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::Hindi => "हिंदी",
            Language::Gujarati => "ગુજરાતી",
            Language::Tamil => "தமிழ்",
            Language::Marathi => "मराठी",
            Language::Malayalam => "മലയാളം",
            Language::Bengali => "বাংলা",
            Language::Telugu => "తెలుగు",
            Language::Kannada => "ಕನ್ನಡ",
            Language::English => "English",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Language::Hindi => "Hindi",
            Language::Gujarati => "Gujarati",
            Language::Tamil => "Tamil",
            Language::Marathi => "Marathi",
            Language::Malayalam => "Malayalam",
            Language::Bengali => "Bengali",
            Language::Telugu => "Telugu",
            Language::Kannada => "Kannada",
            Language::English => "English",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.english_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_serde_names() {
        let lang: Language = serde_json::from_str("\"tamil\"").unwrap();
        assert_eq!(lang, Language::Tamil);
        assert_eq!(lang.code(), "ta");
        assert_eq!(lang.to_string(), "Tamil");
    }
}

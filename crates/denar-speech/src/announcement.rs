//! Announcement text for detection results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use denar_models::{CurrencyType, Denomination, DetectionResult};

use crate::error::SpeechError;

/// Announcement language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "mk")]
    Macedonian,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Macedonian => "mk",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mk" | "mk-mk" | "macedonian" => Ok(Language::Macedonian),
            "en" | "en-us" | "english" => Ok(Language::English),
            _ => Err(SpeechError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Compose the spoken text for a detection result.
pub fn compose_announcement(result: &DetectionResult, language: Language) -> String {
    let Some(best) = result.best() else {
        return match language {
            Language::Macedonian => "Не е детектирана валута!".to_string(),
            Language::English => "No currency detected".to_string(),
        };
    };

    let class_name = best.class_name();
    let denomination = Denomination::from_class_name(class_name);
    let currency_type = result
        .currency_type
        .or(denomination.map(|d| d.currency_type))
        .unwrap_or_else(|| CurrencyType::from_class_name(class_name));

    let kind = match (language, currency_type) {
        (Language::Macedonian, CurrencyType::Note) => "банкнота",
        (Language::Macedonian, CurrencyType::Coin) => "монета",
        (Language::English, CurrencyType::Note) => "banknote",
        (Language::English, CurrencyType::Coin) => "coin",
    };

    let name = match (denomination, language) {
        (Some(d), Language::Macedonian) => d.name_mk.to_string(),
        (Some(d), Language::English) => d.name_en.to_string(),
        (None, _) => class_name.replace('_', " "),
    };

    match language {
        Language::Macedonian => format!("Детектирана {}: {}", kind, name),
        Language::English => format!("Detected {}: {}", kind, name),
    }
}

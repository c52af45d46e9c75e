//! Currency types and model registry keys.
//!
//! The binary stage classifies an image as a banknote (`note`) or a coin
//! (`coin`); that decision routes the image to one of the denomination
//! models registered under a [`ModelKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Kind of currency routed by the binary stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyType {
    /// Paper banknote.
    Note,
    /// Metal coin.
    Coin,
}

impl CurrencyType {
    /// Returns the type name as used by the binary model's class labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyType::Note => "note",
            CurrencyType::Coin => "coin",
        }
    }

    /// Returns the name of the specific model family (`banknote` or `coin`).
    pub fn family_name(&self) -> &'static str {
        match self {
            CurrencyType::Note => "banknote",
            CurrencyType::Coin => "coin",
        }
    }

    /// Route a binary-stage class label to a currency type.
    ///
    /// Labels naming a note route to [`CurrencyType::Note`]; everything else
    /// routes to [`CurrencyType::Coin`].
    pub fn from_class_name(class_name: &str) -> Self {
        let lowered = class_name.trim().to_lowercase();
        if lowered == "note" || lowered == "banknote" || lowered.ends_with("note") {
            CurrencyType::Note
        } else {
            CurrencyType::Coin
        }
    }

    /// The specific model that identifies denominations of this type.
    pub fn specific_model(&self) -> ModelKey {
        match self {
            CurrencyType::Note => ModelKey::Banknote,
            CurrencyType::Coin => ModelKey::Coin,
        }
    }
}

impl fmt::Display for CurrencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CurrencyType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "note" | "banknote" => Ok(CurrencyType::Note),
            "coin" => Ok(CurrencyType::Coin),
            _ => Err(ModelError::UnknownCurrencyType(s.to_string())),
        }
    }
}

/// Key of a detector in the model registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKey {
    /// Note-vs-coin classifier.
    Binary,
    /// Banknote denomination detector.
    Banknote,
    /// Coin denomination detector.
    Coin,
}

impl ModelKey {
    /// All registry keys, in load order.
    pub const ALL: &'static [ModelKey] = &[ModelKey::Binary, ModelKey::Banknote, ModelKey::Coin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Binary => "binary",
            ModelKey::Banknote => "banknote",
            ModelKey::Coin => "coin",
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binary" => Ok(ModelKey::Binary),
            "banknote" | "note" => Ok(ModelKey::Banknote),
            "coin" => Ok(ModelKey::Coin),
            _ => Err(ModelError::UnknownModelKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_type_parse() {
        assert_eq!("note".parse::<CurrencyType>().unwrap(), CurrencyType::Note);
        assert_eq!("Coin".parse::<CurrencyType>().unwrap(), CurrencyType::Coin);
        assert!("bill".parse::<CurrencyType>().is_err());
    }

    #[test]
    fn test_routing_from_class_name() {
        assert_eq!(CurrencyType::from_class_name("note"), CurrencyType::Note);
        assert_eq!(CurrencyType::from_class_name("coin"), CurrencyType::Coin);
        assert_eq!(CurrencyType::from_class_name("something"), CurrencyType::Coin);
    }

    #[test]
    fn test_specific_model_routing() {
        assert_eq!(CurrencyType::Note.specific_model(), ModelKey::Banknote);
        assert_eq!(CurrencyType::Coin.specific_model(), ModelKey::Coin);
        assert_eq!(CurrencyType::Note.family_name(), "banknote");
    }

    #[test]
    fn test_model_key_display() {
        assert_eq!(ModelKey::Binary.to_string(), "binary");
        assert_eq!("banknote".parse::<ModelKey>().unwrap(), ModelKey::Banknote);
        assert_eq!(ModelKey::ALL.len(), 3);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&CurrencyType::Note).unwrap(), "\"note\"");
        assert_eq!(serde_json::to_string(&ModelKey::Banknote).unwrap(), "\"banknote\"");
    }
}

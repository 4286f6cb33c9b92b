// How a credential was redeemed

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckInMethod {
    ScannedCode,
    ManualCode,
    ManualId,
}

impl CheckInMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInMethod::ScannedCode => "scanned-code",
            CheckInMethod::ManualCode => "manual-code",
            CheckInMethod::ManualId => "manual-id",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "scanned-code" => Some(CheckInMethod::ScannedCode),
            "manual-code" => Some(CheckInMethod::ManualCode),
            "manual-id" => Some(CheckInMethod::ManualId),
            _ => None,
        }
    }
}

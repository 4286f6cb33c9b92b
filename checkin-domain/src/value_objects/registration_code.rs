// Registration code value object
// 8 characters drawn from [A-Z0-9]

use std::fmt;

use serde::{Deserialize, Serialize};

pub const REGISTRATION_CODE_LEN: usize = 8;
pub const REGISTRATION_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationCode(String);

impl RegistrationCode {
    /// Accepts manual entry: surrounding whitespace is ignored and lowercase is folded.
    pub fn parse(raw: &str) -> Option<Self> {
        let candidate = raw.trim().to_ascii_uppercase();
        if Self::is_well_formed(&candidate) {
            Some(Self(candidate))
        } else {
            None
        }
    }

    /// Builds a code from alphabet indices produced by `pick_index(alphabet_len)`.
    pub fn generate_with(mut pick_index: impl FnMut(usize) -> usize) -> Self {
        let alphabet_len = REGISTRATION_CODE_ALPHABET.len();
        let code = (0..REGISTRATION_CODE_LEN)
            .map(|_| char::from(REGISTRATION_CODE_ALPHABET[pick_index(alphabet_len) % alphabet_len]))
            .collect();
        Self(code)
    }

    pub fn is_well_formed(value: &str) -> bool {
        value.len() == REGISTRATION_CODE_LEN
            && value
                .bytes()
                .all(|byte| REGISTRATION_CODE_ALPHABET.contains(&byte))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegistrationCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_well_formed(&value) {
            Ok(Self(value))
        } else {
            Err(format!("invalid registration code '{}'", value))
        }
    }
}

impl From<RegistrationCode> for String {
    fn from(code: RegistrationCode) -> Self {
        code.0
    }
}

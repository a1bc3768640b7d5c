// Generator profiles - secret value generation

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

const DEFAULT_LENGTH: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorFormat {
    Hex,
    Base64,
}

impl fmt::Display for GeneratorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorFormat::Hex => write!(f, "hex"),
            GeneratorFormat::Base64 => write!(f, "base64"),
        }
    }
}

/// A named recipe for generating secret values: an output encoding plus the
/// number of random bytes fed into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub format: GeneratorFormat,
    #[serde(default = "default_length")]
    pub length: u32,
}

fn default_length() -> u32 {
    DEFAULT_LENGTH
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            format: GeneratorFormat::Hex,
            length: DEFAULT_LENGTH,
        }
    }
}

/// Generate a fresh secret from OS randomness.
pub fn generate(profile: &GeneratorConfig) -> String {
    let mut bytes = vec![0u8; profile.length as usize];
    OsRng.fill_bytes(&mut bytes);

    match profile.format {
        GeneratorFormat::Hex => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        GeneratorFormat::Base64 => STANDARD.encode(&bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_output_has_two_chars_per_byte() {
        let profile = GeneratorConfig {
            format: GeneratorFormat::Hex,
            length: 16,
        };
        let secret = generate(&profile);
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn base64_output_decodes_to_requested_length() {
        let profile = GeneratorConfig {
            format: GeneratorFormat::Base64,
            length: 24,
        };
        let secret = generate(&profile);
        let decoded = STANDARD.decode(secret).unwrap();
        assert_eq!(decoded.len(), 24);
    }

    #[test]
    fn consecutive_secrets_differ() {
        let profile = GeneratorConfig::default();
        assert_ne!(generate(&profile), generate(&profile));
    }
}

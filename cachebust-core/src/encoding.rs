//! Digest encoding - compact, filesystem-safe tokens
//!
//! A digest is read as one unsigned little-endian integer and written out in
//! base N (N = alphabet size), least-significant digit first.

use crate::pipeline::PipelineError;

/// Digits followed by lowercase ASCII letters
pub const BASE36_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEncoder {
    alphabet: Vec<char>,
}

impl DigestEncoder {
    /// Create an encoder over a custom alphabet of at least two symbols
    pub fn new(alphabet: &str) -> Result<Self, PipelineError> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.len() < 2 {
            return Err(PipelineError::InvalidArgument(format!(
                "encoding alphabet needs at least 2 symbols, got {}",
                alphabet.len()
            )));
        }
        Ok(Self { alphabet })
    }

    pub fn base36() -> Self {
        Self {
            alphabet: BASE36_ALPHABET.chars().collect(),
        }
    }

    /// Encode bytes into a token
    ///
    /// Zero (all-zero or empty input) encodes to the empty string.
    pub fn encode(&self, bytes: &[u8]) -> String {
        let base = self.alphabet.len() as u32;

        // Most significant byte first, leading zeros stripped.
        let mut dividend: Vec<u8> = bytes
            .iter()
            .rev()
            .copied()
            .skip_while(|b| *b == 0)
            .collect();

        let mut token = String::new();
        while !dividend.is_empty() {
            let mut remainder = 0u32;
            let mut quotient = Vec::with_capacity(dividend.len());
            for byte in &dividend {
                let acc = (remainder << 8) | u32::from(*byte);
                let digit = acc / base;
                remainder = acc % base;
                if !(quotient.is_empty() && digit == 0) {
                    quotient.push(digit as u8);
                }
            }
            token.push(self.alphabet[remainder as usize]);
            dividend = quotient;
        }
        token
    }
}

impl Default for DigestEncoder {
    fn default() -> Self {
        Self::base36()
    }
}

/// Encode with the default base-36 alphabet
pub fn encode_base36(bytes: &[u8]) -> String {
    DigestEncoder::base36().encode(bytes)
}

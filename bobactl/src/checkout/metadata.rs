//! The cart as frozen into provider session metadata.
//!
//! Provider metadata is a flat map of short strings, so the resolved cart lines are stored
//! as JSON split across `cart_0 .. cart_{n-1}` (with `cart_chunks = n`) and the charged
//! total as a decimal string under `total_amount`. Decoding is strict: any missing chunk,
//! malformed JSON, bad total or zero quantity is an error, never a best-effort guess.

use std::collections::BTreeMap;

use crate::pricing::{CartLine, MinorUnits};

/// Longest value the provider accepts for a single metadata key
pub const MAX_METADATA_VALUE_LEN: usize = 500;

/// Keys left over for cart chunks once the fixed keys are accounted for
pub const MAX_CART_CHUNKS: usize = 48;

pub const TOTAL_AMOUNT_KEY: &str = "total_amount";
pub const CART_CHUNKS_KEY: &str = "cart_chunks";

fn chunk_key(index: usize) -> String {
    format!("cart_{index}")
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata key '{0}' is missing")]
    MissingKey(String),

    #[error("metadata key '{key}' has invalid value '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("cart is too large to store in session metadata ({chunks} chunks)")]
    CartTooLarge { chunks: usize },

    #[error("cart JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cart line for product {0} has zero quantity")]
    EmptyLine(String),
}

/// Priced cart lines and total, frozen at checkout time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenCart {
    pub lines: Vec<CartLine>,
    pub total: MinorUnits,
}

impl FrozenCart {
    pub fn new(lines: Vec<CartLine>, total: MinorUnits) -> Self {
        Self { lines, total }
    }

    /// Encode into provider metadata entries
    pub fn encode(&self) -> Result<BTreeMap<String, String>, MetadataError> {
        let json = serde_json::to_string(&self.lines)?;
        let chars: Vec<char> = json.chars().collect();
        let chunks: Vec<String> = chars
            .chunks(MAX_METADATA_VALUE_LEN)
            .map(|chunk| chunk.iter().collect())
            .collect();

        if chunks.len() > MAX_CART_CHUNKS {
            return Err(MetadataError::CartTooLarge { chunks: chunks.len() });
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(TOTAL_AMOUNT_KEY.to_string(), self.total.to_string());
        metadata.insert(CART_CHUNKS_KEY.to_string(), chunks.len().to_string());
        for (index, chunk) in chunks.into_iter().enumerate() {
            metadata.insert(chunk_key(index), chunk);
        }

        Ok(metadata)
    }

    /// Reassemble a cart from provider metadata
    pub fn decode(metadata: &BTreeMap<String, String>) -> Result<Self, MetadataError> {
        let get = |key: &str| metadata.get(key).ok_or_else(|| MetadataError::MissingKey(key.to_string()));
        let invalid = |key: &str, value: &str| MetadataError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        let raw_total = get(TOTAL_AMOUNT_KEY)?;
        let total: MinorUnits = raw_total
            .trim()
            .parse()
            .ok()
            .filter(|total| *total >= 0)
            .ok_or_else(|| invalid(TOTAL_AMOUNT_KEY, raw_total))?;

        let raw_chunks = get(CART_CHUNKS_KEY)?;
        let chunks: usize = raw_chunks
            .trim()
            .parse()
            .ok()
            .filter(|chunks| (1..=MAX_CART_CHUNKS).contains(chunks))
            .ok_or_else(|| invalid(CART_CHUNKS_KEY, raw_chunks))?;

        let mut json = String::new();
        for index in 0..chunks {
            json.push_str(get(&chunk_key(index))?);
        }

        let lines: Vec<CartLine> = serde_json::from_str(&json)?;
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(MetadataError::EmptyLine(line.product_id.clone()));
        }

        Ok(Self { lines, total })
    }
}

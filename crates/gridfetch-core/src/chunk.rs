//! Band-chunk model: a named, ordered group of embedding bands fetched
//! together as one artifact.

/// Band 1 of every artifact is the categorical label.
pub const LABEL_BAND_NAME: &str = "wetland_label";

/// Identifier for embedding band index `i` (1-based), e.g. `A07`.
pub fn band_id(i: u16) -> String {
    format!("A{:02}", i)
}

/// A named, ordered subset of the embedding bands. Defined once from
/// configuration for the whole run; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandChunk {
    pub name: String,
    /// Ordered band identifiers (e.g. `["A01", "A02", ...]`).
    pub bands: Vec<String>,
}

impl BandChunk {
    /// Builds a chunk from 1-based band indices, preserving their order.
    pub fn from_indices(name: impl Into<String>, indices: &[u16]) -> Self {
        Self {
            name: name.into(),
            bands: indices.iter().map(|&i| band_id(i)).collect(),
        }
    }

    /// Expected band count of a persisted artifact: the label plus every
    /// embedding band of this chunk.
    pub fn expected_band_count(&self) -> usize {
        1 + self.bands.len()
    }

    /// Band descriptions in artifact order: `wetland_label`, then
    /// `embedding_0..embedding_{n-1}`.
    pub fn band_descriptions(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.expected_band_count());
        out.push(LABEL_BAND_NAME.to_string());
        for k in 0..self.bands.len() {
            out.push(format!("embedding_{}", k));
        }
        out
    }
}

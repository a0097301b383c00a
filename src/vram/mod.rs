//! VRAM requirement estimation.
//!
//! Maps a model's on-disk size and a few runtime parameters to a memory
//! breakdown. The estimate is a heuristic: layer depth is guessed from weight
//! size and the KV cache is modelled as a flat cost per token per layer, so it
//! does not generalize across every model family.
//!
//! ```rust
//! use llmdeck::upstream::ModelDescriptor;
//! use llmdeck::vram::{estimate, CalculationInput, Precision};
//!
//! let input = CalculationInput {
//!     model: ModelDescriptor::sized("llama3:8b", 4 * 1024 * 1024 * 1024),
//!     context_length: 4096,
//!     precision: Precision::Fp16,
//!     batch_size: 1,
//!     framework_overhead_mb: 1024.0,
//! };
//! let result = estimate(&input);
//! assert_eq!(result.base_model_vram_mb, 4096.0);
//! assert!((result.total_vram_gb - 5.000244).abs() < 1e-6);
//! ```

use crate::upstream::ModelDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Bytes of KV cache per token, per layer, per sequence.
const KV_BYTES_PER_TOKEN_LAYER: f64 = 2.0;

/// Largest context length the clamping helper allows.
pub const MAX_CONTEXT_LENGTH: u32 = 131_072;
pub const DEFAULT_CONTEXT_LENGTH: u32 = 4096;
pub const DEFAULT_FRAMEWORK_OVERHEAD_MB: f64 = 1024.0;

/// Numeric width of model weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    #[default]
    Fp16,
    Int8,
    Int4,
}

impl Precision {
    pub const ALL: [Precision; 4] = [
        Precision::Fp32,
        Precision::Fp16,
        Precision::Int8,
        Precision::Int4,
    ];

    /// Scale applied to on-disk size. Sizes are taken as fp16 weights.
    pub fn multiplier(self) -> f64 {
        match self {
            Precision::Fp32 => 2.0,
            Precision::Fp16 => 1.0,
            Precision::Int8 => 0.5,
            Precision::Int4 => 0.25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Int8 => "int8",
            Precision::Int4 => "int4",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fp32" => Ok(Precision::Fp32),
            "fp16" => Ok(Precision::Fp16),
            "int8" => Ok(Precision::Int8),
            "int4" => Ok(Precision::Int4),
            other => Err(format!(
                "unknown precision '{}' (expected fp32, fp16, int8 or int4)",
                other
            )),
        }
    }
}

/// Inputs to one estimate. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInput {
    pub model: ModelDescriptor,
    pub context_length: u32,
    pub precision: Precision,
    pub batch_size: u32,
    #[serde(rename = "frameworkOverheadMB")]
    pub framework_overhead_mb: f64,
}

impl CalculationInput {
    /// Bring raw user input into the ranges [`estimate`] expects.
    ///
    /// Context length is kept within `1..=MAX_CONTEXT_LENGTH`, batch size is at
    /// least 1, and overhead is finite and non-negative.
    pub fn clamped(mut self) -> Self {
        self.context_length = self.context_length.clamp(1, MAX_CONTEXT_LENGTH);
        self.batch_size = self.batch_size.max(1);
        if !self.framework_overhead_mb.is_finite() || self.framework_overhead_mb < 0.0 {
            self.framework_overhead_mb = 0.0;
        }
        self
    }
}

/// Memory breakdown. Recomputed on every input change, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    #[serde(rename = "baseModelVramMB")]
    pub base_model_vram_mb: f64,
    #[serde(rename = "contextBufferMB")]
    pub context_buffer_mb: f64,
    #[serde(rename = "frameworkOverheadMB")]
    pub framework_overhead_mb: f64,
    #[serde(rename = "totalVramGB")]
    pub total_vram_gb: f64,
    pub estimated_layers: u32,
    pub precision: Precision,
    pub context_length: u32,
    pub batch_size: u32,
}

impl CalculationResult {
    pub fn total_vram_mb(&self) -> f64 {
        self.base_model_vram_mb + self.context_buffer_mb + self.framework_overhead_mb
    }
}

/// Guess transformer depth from weight size.
///
/// Size bands in GiB: <1 → 12, <8 → 32, <15 → 40, <30 → 60, otherwise 80.
pub fn estimated_layers(size_bytes: u64) -> u32 {
    let size_gb = size_bytes as f64 / BYTES_PER_GB;
    if size_gb < 1.0 {
        12
    } else if size_gb < 8.0 {
        32
    } else if size_gb < 15.0 {
        40
    } else if size_gb < 30.0 {
        60
    } else {
        80
    }
}

/// Estimate VRAM for the given input.
///
/// Pure and infallible. Callers sanitize input first (see
/// [`CalculationInput::clamped`]); nothing is clamped here.
pub fn estimate(input: &CalculationInput) -> CalculationResult {
    let base_model_vram_mb =
        (input.model.size_bytes as f64 / BYTES_PER_MB) * input.precision.multiplier();

    let layers = estimated_layers(input.model.size_bytes);
    let context_buffer_mb = (input.context_length as f64
        * KV_BYTES_PER_TOKEN_LAYER
        * layers as f64
        * input.batch_size as f64)
        / BYTES_PER_MB;

    let total_vram_mb = base_model_vram_mb + context_buffer_mb + input.framework_overhead_mb;

    CalculationResult {
        base_model_vram_mb,
        context_buffer_mb,
        framework_overhead_mb: input.framework_overhead_mb,
        total_vram_gb: total_vram_mb / 1024.0,
        estimated_layers: layers,
        precision: input.precision,
        context_length: input.context_length,
        batch_size: input.batch_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn input(size_bytes: u64, precision: Precision) -> CalculationInput {
        CalculationInput {
            model: ModelDescriptor::sized("test", size_bytes),
            context_length: 4096,
            precision,
            batch_size: 1,
            framework_overhead_mb: 1024.0,
        }
    }

    #[test]
    fn test_four_gib_fp16_example() {
        let result = estimate(&input(4 * GIB, Precision::Fp16));

        assert_eq!(result.base_model_vram_mb, 4096.0);
        assert_eq!(result.estimated_layers, 32);
        assert_eq!(result.context_buffer_mb, 0.25);
        assert_eq!(result.framework_overhead_mb, 1024.0);
        assert!((result.total_vram_gb - 5120.25 / 1024.0).abs() < 1e-12);
        assert!((result.total_vram_gb - 5.0002).abs() < 1e-4);
    }

    #[test]
    fn test_precision_multipliers() {
        assert_eq!(Precision::Fp32.multiplier(), 2.0);
        assert_eq!(Precision::Fp16.multiplier(), 1.0);
        assert_eq!(Precision::Int8.multiplier(), 0.5);
        assert_eq!(Precision::Int4.multiplier(), 0.25);
    }

    #[test]
    fn test_layer_bands() {
        assert_eq!(estimated_layers(0), 12);
        assert_eq!(estimated_layers(GIB - 1), 12);
        assert_eq!(estimated_layers(GIB), 32);
        assert_eq!(estimated_layers(8 * GIB - 1), 32);
        assert_eq!(estimated_layers(8 * GIB), 40);
        assert_eq!(estimated_layers(15 * GIB), 60);
        assert_eq!(estimated_layers(29 * GIB), 60);
        assert_eq!(estimated_layers(30 * GIB), 80);
        assert_eq!(estimated_layers(400 * GIB), 80);
    }

    #[test]
    fn test_context_buffer_scales_with_batch() {
        let mut i = input(4 * GIB, Precision::Fp16);
        let single = estimate(&i).context_buffer_mb;
        i.batch_size = 8;
        assert_eq!(estimate(&i).context_buffer_mb, single * 8.0);
    }

    #[test]
    fn test_result_echoes_parameters() {
        let mut i = input(2 * GIB, Precision::Int4);
        i.context_length = 8192;
        i.batch_size = 3;
        let r = estimate(&i);
        assert_eq!(r.precision, Precision::Int4);
        assert_eq!(r.context_length, 8192);
        assert_eq!(r.batch_size, 3);
    }

    #[test]
    fn test_clamped_raises_degenerate_values() {
        let mut i = input(GIB, Precision::Fp16);
        i.context_length = 0;
        i.batch_size = 0;
        i.framework_overhead_mb = -5.0;
        let c = i.clamped();
        assert_eq!(c.context_length, 1);
        assert_eq!(c.batch_size, 1);
        assert_eq!(c.framework_overhead_mb, 0.0);
    }

    #[test]
    fn test_clamped_caps_context_and_rejects_nan() {
        let mut i = input(GIB, Precision::Fp16);
        i.context_length = 1_000_000;
        i.framework_overhead_mb = f64::NAN;
        let c = i.clamped();
        assert_eq!(c.context_length, MAX_CONTEXT_LENGTH);
        assert_eq!(c.framework_overhead_mb, 0.0);
    }

    #[test]
    fn test_precision_parse_and_display() {
        for p in Precision::ALL {
            assert_eq!(p.to_string().parse::<Precision>().unwrap(), p);
        }
        assert_eq!("INT8".parse::<Precision>().unwrap(), Precision::Int8);
        assert!("bf16".parse::<Precision>().is_err());
    }

    #[test]
    fn test_result_serializes_display_names() {
        let json = serde_json::to_value(estimate(&input(4 * GIB, Precision::Fp16))).unwrap();
        assert_eq!(json["baseModelVramMB"], 4096.0);
        assert_eq!(json["contextBufferMB"], 0.25);
        assert_eq!(json["precision"], "fp16");
        assert!(json.get("totalVramGB").is_some());
    }

    fn any_precision() -> impl Strategy<Value = Precision> {
        prop_oneof![
            Just(Precision::Fp32),
            Just(Precision::Fp16),
            Just(Precision::Int8),
            Just(Precision::Int4),
        ]
    }

    proptest! {
        #[test]
        fn prop_estimate_is_deterministic(
            size in 0u64..(200 * GIB),
            ctx in 1u32..=MAX_CONTEXT_LENGTH,
            batch in 1u32..64,
            overhead in 0.0f64..8192.0,
            precision in any_precision(),
        ) {
            let i = CalculationInput {
                model: ModelDescriptor::sized("m", size),
                context_length: ctx,
                precision,
                batch_size: batch,
                framework_overhead_mb: overhead,
            };
            let a = estimate(&i);
            let b = estimate(&i);
            prop_assert_eq!(a.total_vram_gb.to_bits(), b.total_vram_gb.to_bits());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_total_is_sum_of_components(
            size in 0u64..(200 * GIB),
            ctx in 1u32..=MAX_CONTEXT_LENGTH,
            batch in 1u32..64,
            overhead in 0.0f64..8192.0,
            precision in any_precision(),
        ) {
            let r = estimate(&CalculationInput {
                model: ModelDescriptor::sized("m", size),
                context_length: ctx,
                precision,
                batch_size: batch,
                framework_overhead_mb: overhead,
            });
            let sum = r.base_model_vram_mb + r.context_buffer_mb + r.framework_overhead_mb;
            prop_assert!((r.total_vram_gb * 1024.0 - sum).abs() <= 1e-9 * sum.max(1.0));
        }

        #[test]
        fn prop_precision_monotonic(size in 0u64..(200 * GIB)) {
            let base = |p| estimate(&input(size, p)).base_model_vram_mb;
            prop_assert!(base(Precision::Fp32) >= base(Precision::Fp16));
            prop_assert!(base(Precision::Fp16) >= base(Precision::Int8));
            prop_assert!(base(Precision::Int8) >= base(Precision::Int4));
        }
    }
}

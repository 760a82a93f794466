//! Sampler state helpers.

pub use crate::backend::{Filter, FilterMode, MipmapFilter, Wrap, WrapMode};

/// Keeps the LOD bias strictly inside the device range.
pub const LOD_BIAS_EPSILON: f32 = 0.01;

/// Clamp a mipmap sharpness value into `(-max_lod_bias, max_lod_bias)`.
pub fn clamp_sharpness(sharpness: f32, max_lod_bias: f32) -> f32 {
    let limit = max_lod_bias - LOD_BIAS_EPSILON;
    if limit <= 0.0 {
        return 0.0;
    }
    sharpness.max(-limit).min(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_sharpness() {
        assert_eq!(clamp_sharpness(1.5, 4.0), 1.5);
        assert_eq!(clamp_sharpness(10.0, 4.0), 4.0 - LOD_BIAS_EPSILON);
        assert_eq!(clamp_sharpness(-10.0, 4.0), -(4.0 - LOD_BIAS_EPSILON));
        assert_eq!(clamp_sharpness(2.0, 0.0), 0.0);
    }
}

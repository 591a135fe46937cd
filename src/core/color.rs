//! Color conversions at the edges of the pipeline.
//!
//! Splat files store color as the DC (zeroth-order) spherical-harmonic
//! coefficient per channel; the renderer works on flat RGB in [0, 1] and
//! only converts to 8-bit at readback, through a simple power curve:
//!
//! out = clamp(c, 0, 1) ^ 0.8 * 255   (truncated)
//!
//! This is NOT an sRGB transfer function, it is the thumbnail tone curve.

use nalgebra::Vector3;

/// Y_0^0, the constant SH basis value.
pub const SH_C0: f32 = 0.282_094_8;

/// Exponent of the output tone curve.
pub const OUTPUT_GAMMA: f32 = 0.8;

/// Convert one SH DC coefficient to a color channel in [0, 1].
pub fn sh_dc_to_channel(coeff: f32) -> f32 {
    (0.5 + coeff * SH_C0).clamp(0.0, 1.0)
}

/// Convert the three SH DC coefficients to flat RGB.
pub fn sh_dc_to_rgb(dc: [f32; 3]) -> Vector3<f32> {
    Vector3::new(
        sh_dc_to_channel(dc[0]),
        sh_dc_to_channel(dc[1]),
        sh_dc_to_channel(dc[2]),
    )
}

/// Apply the output tone curve and quantize to 8 bits.
pub fn tone_map_u8(x: f32) -> u8 {
    // NaN clamps to NaN and `as u8` saturates it to 0.
    let c = x.clamp(0.0, 1.0);
    (c.powf(OUTPUT_GAMMA) * 255.0) as u8
}

//! Integer/float sample conversion for resampling.

pub fn i16_to_f32(input: i16) -> f32 {
    let i16_min = i16::MIN as f32;
    let i16_max = i16::MAX as f32;
    let input = input as f32;

    let range = i16_max - i16_min;

    let res = (input + 0.5) / (range / 2.0);
    debug_assert!(res >= -1.0 && res <= 1.0);
    res
}

/// Inverse of [`i16_to_f32`]. Out-of-range input is clamped.
pub fn f32_to_i16(input: f32) -> i16 {
    let i16_min = i16::MIN as f32;
    let i16_max = i16::MAX as f32;
    let input = input.clamp(-1.0, 1.0);

    let range = i16_max - i16_min;
    let res = (input * (range / 2.0)) - 0.5;
    res.round().clamp(i16_min, i16_max) as i16
}

pub fn i16_slice_to_f32(input: &[i16]) -> Vec<f32> {
    input.iter().copied().map(i16_to_f32).collect()
}

pub fn f32_slice_to_i16(input: &[f32]) -> Vec<i16> {
    input.iter().copied().map(f32_to_i16).collect()
}

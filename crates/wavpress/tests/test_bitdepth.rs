use proptest::prelude::*;
use wavpress::bitdepth::*;

fn do_i16_to_f32_roundtrip(i1: i16) {
    let f = i16_to_f32(i1);
    assert!((-1.0..=1.0).contains(&f));
    let i2 = f32_to_i16(f);
    assert_eq!(i1, i2);
}

#[test]
fn i16_to_f32_roundtrips() {
    do_i16_to_f32_roundtrip(0);
    do_i16_to_f32_roundtrip(i16::MIN);
    do_i16_to_f32_roundtrip(i16::MAX);
}

#[test]
fn out_of_range_floats_clamp() {
    assert_eq!(f32_to_i16(4.0), i16::MAX);
    assert_eq!(f32_to_i16(-4.0), i16::MIN);
}

#[test]
fn slices_keep_length() {
    let input = [i16::MIN, -1, 0, 1, i16::MAX];
    let floats = i16_slice_to_f32(&input);
    assert_eq!(floats.len(), input.len());
    assert_eq!(f32_slice_to_i16(&floats), input);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256 * 256))]

    #[test]
    fn i16_to_f32_roundtrip(
        i1 in any::<i16>()
    ) {
        do_i16_to_f32_roundtrip(i1);
    }
}

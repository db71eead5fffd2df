use super::*;

#[test]
fn secs_round_half_away_from_zero() {
    assert_eq!(secs_to_us(1.0), TimeUs(1_000_000));
    assert_eq!(secs_to_us(0.0000005), TimeUs(1));
    assert_eq!(secs_to_us(-0.0000005), TimeUs(-1));
    assert_eq!(secs_to_us(0.0000004), TimeUs(0));
    assert_eq!(secs_to_us(f64::NAN), TimeUs(0));
}

#[test]
fn seconds_roundtrip_through_us() {
    let t = TimeUs::from_secs(2.5);
    assert_eq!(t.as_micros(), 2_500_000);
    assert_eq!(t.as_secs(), 2.5);
}

#[test]
fn frame_grid_is_computed_from_index() {
    for i in 0..600u64 {
        let expected = ((i as f64) * 1_000_000.0 / 30.0).round() as i64;
        assert_eq!(frame_to_us(i, 30.0), TimeUs(expected));
    }
    assert_eq!(frame_to_us(1, 30.0), TimeUs(33_333));
    assert_eq!(frame_to_us(2, 30.0), TimeUs(66_667));
}

#[test]
fn frame_inverse_is_nearest() {
    assert_eq!(us_to_frame(TimeUs(33_333), 30.0), 1);
    assert_eq!(us_to_frame(TimeUs(49_000), 30.0), 1);
    assert_eq!(us_to_frame(TimeUs(51_000), 30.0), 2);
    assert_eq!(us_to_frame(TimeUs(-10), 30.0), 0);
}

#[test]
fn frame_count_absorbs_float_noise() {
    assert_eq!(frame_count(2.0, 30.0), 60);
    assert_eq!(frame_count(0.1, 30.0), 3);
    assert_eq!(frame_count(10.0, 29.97), 300);
    assert_eq!(frame_count(0.0, 30.0), 0);
    assert_eq!(frame_count(f64::NAN, 30.0), 0);
}

#[test]
fn sample_conversions_use_integer_math() {
    assert_eq!(sample_to_us(48_000, 48_000), TimeUs(1_000_000));
    assert_eq!(sample_to_us(1, 48_000), TimeUs(21));
    assert_eq!(sample_to_us(3, 48_000), TimeUs(63));
    assert_eq!(sample_to_us(10, 0), TimeUs::ZERO);
    assert_eq!(us_to_samples_ceil(TimeUs(1_000_000), 48_000), 48_000);
    assert_eq!(us_to_samples_ceil(TimeUs(1), 48_000), 1);
    assert_eq!(us_to_samples_ceil(TimeUs(-5), 48_000), 0);
    assert_eq!(us_to_sample(TimeUs(500_000), 44_100), 22_050);
}

#[test]
fn clamp_handles_inverted_bounds_without_panicking() {
    assert_eq!(clamp(5, 0, 10), 5);
    assert_eq!(clamp(-1, 0, 10), 0);
    assert_eq!(clamp(11, 0, 10), 10);
    assert_eq!(clamp(3.0, 4.0, 1.0), 4.0);
}

#[test]
fn time_arithmetic_saturates() {
    assert_eq!(TimeUs(i64::MAX) + TimeUs(1), TimeUs(i64::MAX));
    assert_eq!(TimeUs(5).saturating_since(TimeUs(9)), TimeUs::ZERO);
    assert_eq!(TimeUs(9) - TimeUs(5), TimeUs(4));
}

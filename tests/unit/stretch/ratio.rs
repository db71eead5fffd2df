use super::*;
use crate::foundation::timebase::TimeUs;
use proptest::prelude::*;

#[test]
fn non_finite_is_exactly_one() {
    assert_eq!(safe_ratio(f64::NAN), 1.0);
    assert_eq!(safe_ratio(f64::INFINITY), 1.0);
    assert_eq!(safe_ratio(f64::NEG_INFINITY), 1.0);
}

#[test]
fn out_of_range_is_clamped() {
    assert_eq!(safe_ratio(0.0), MIN_RATIO);
    assert_eq!(safe_ratio(-3.0), MIN_RATIO);
    assert_eq!(safe_ratio(100.0), MAX_RATIO);
    assert_eq!(safe_ratio(1.5), 1.5);
}

#[test]
fn curve_samples_at_output_time() {
    let ratio_at = |t: TimeUs| if t < TimeUs(1_000) { 0.5 } else { f64::NAN };
    let curve = sample_ratio_curve(&ratio_at, 4, 2_000);
    // Frames at 0us, 500us, 1000us, 1500us.
    assert_eq!(curve, vec![0.5, 0.5, 1.0, 1.0]);
    assert_eq!(input_frames_for_curve(&curve), 6.0);
}

proptest! {
    #[test]
    fn safe_ratio_stays_in_range(r in any::<f64>()) {
        let s = safe_ratio(r);
        prop_assert!((MIN_RATIO..=MAX_RATIO).contains(&s));
        if !r.is_finite() {
            prop_assert_eq!(s, 1.0);
        }
    }
}

use super::*;

fn key(time: f64, value: f64) -> Keyframe<f64> {
    Keyframe {
        time,
        value,
        in_interp: InterpMode::Linear,
        out_interp: InterpMode::Linear,
        ease_in: Vec::new(),
        ease_out: Vec::new(),
    }
}

fn keyed(keys: Vec<Keyframe<f64>>) -> Property<f64> {
    Property {
        static_value: None,
        keys,
    }
}

#[test]
fn static_value_wins_over_keys() {
    let p = Property {
        static_value: Some(7.0),
        keys: vec![key(0.0, 0.0), key(1.0, 100.0)],
    };
    assert_eq!(p.value_at(0.5), Some(7.0));
}

#[test]
fn empty_property_yields_none() {
    let p: Property<f64> = keyed(Vec::new());
    assert_eq!(p.value_at(0.0), None);
}

#[test]
fn values_clamp_outside_the_keyed_range() {
    let p = keyed(vec![key(1.0, 10.0), key(2.0, 20.0)]);
    assert_eq!(p.value_at(0.0), Some(10.0));
    assert_eq!(p.value_at(5.0), Some(20.0));
}

#[test]
fn linear_interpolation_hits_the_midpoint() {
    let p = keyed(vec![key(0.0, 0.0), key(2.0, 100.0)]);
    assert_eq!(p.value_at(1.0), Some(50.0));
    assert_eq!(p.value_at(0.5), Some(25.0));
}

#[test]
fn non_bezier_modes_all_interpolate_linearly() {
    // Only eased pairs change the timing curve; HOLD and unrecognized modes
    // sample the same as LINEAR.
    for mode in [InterpMode::Linear, InterpMode::Hold, InterpMode::Unknown] {
        let mut a = key(0.0, 0.0);
        a.out_interp = mode;
        let p = keyed(vec![a, key(1.0, 10.0)]);
        assert_eq!(p.value_at(0.5), Some(5.0));
    }
}

#[test]
fn zero_handles_reduce_exactly_to_linear() {
    // Bezier mode with all-zero handles must produce the linear result, not
    // an approximation of it.
    let mut a = key(0.0, 0.0);
    a.out_interp = InterpMode::Bezier;
    a.ease_out = vec![EaseHandle::default()];
    let mut b = key(1.0, 100.0);
    b.in_interp = InterpMode::Bezier;
    b.ease_in = vec![EaseHandle::default()];
    let p = keyed(vec![a, b]);
    for t in [0.1, 0.25, 0.5, 0.75, 0.9] {
        assert_eq!(p.value_at(t), Some(t * 100.0));
    }
}

#[test]
fn symmetric_ease_slows_the_ends_and_keeps_the_middle() {
    let handle = EaseHandle {
        speed: 0.0,
        influence: 33.333,
    };
    let mut a = key(0.0, 0.0);
    a.out_interp = InterpMode::Bezier;
    a.ease_out = vec![handle];
    let mut b = key(1.0, 100.0);
    b.in_interp = InterpMode::Bezier;
    b.ease_in = vec![handle];
    let p = keyed(vec![a, b]);

    let quarter = p.value_at(0.25).unwrap();
    let mid = p.value_at(0.5).unwrap();
    let three_quarter = p.value_at(0.75).unwrap();
    assert!(quarter < 25.0, "ease-in should lag linear, got {quarter}");
    assert!((mid - 50.0).abs() < 0.5, "symmetric curve, got {mid}");
    assert!(
        three_quarter > 75.0,
        "ease-out should lead linear, got {three_quarter}"
    );
}

#[test]
fn eased_progress_is_monotonic() {
    let mut a = key(0.0, 0.0);
    a.out_interp = InterpMode::Bezier;
    a.ease_out = vec![EaseHandle {
        speed: 0.0,
        influence: 80.0,
    }];
    let mut b = key(1.0, 100.0);
    b.in_interp = InterpMode::Bezier;
    b.ease_in = vec![EaseHandle {
        speed: 0.0,
        influence: 80.0,
    }];
    let p = keyed(vec![a, b]);

    let mut prev = p.value_at(0.0).unwrap();
    for i in 1..=100 {
        let v = p.value_at(i as f64 / 100.0).unwrap();
        assert!(v >= prev - 1e-6, "regression at step {i}: {v} < {prev}");
        prev = v;
    }
}

#[test]
fn vector_blend_holds_components_missing_from_the_right() {
    let a = vec![10.0, 20.0, 5.0];
    let b = vec![20.0, 40.0];
    assert_eq!(Vec::<f64>::blend(&a, &b, 0.5), vec![15.0, 30.0, 5.0]);
}

#[test]
fn unknown_interp_modes_deserialize_and_act_linear() {
    let p: Property<f64> = serde_json::from_str(
        r#"{
            "keys": [
                {"time": 0.0, "value": 0.0, "outInterp": "SOMETHING_NEW"},
                {"time": 1.0, "value": 10.0}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(p.keys[0].out_interp, InterpMode::Unknown);
    assert_eq!(p.value_at(0.5), Some(5.0));
}

#[test]
fn separated_dimensions_sample_independently() {
    let p: DimProperty = serde_json::from_str(
        r#"{
            "separated": true,
            "components": [
                {"name": "X Position", "value": {"keys": [
                    {"time": 0.0, "value": 0.0},
                    {"time": 1.0, "value": 100.0}
                ]}},
                {"name": "Y Position", "value": {"static": 50.0}}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(p.value_at(0.5), Some(vec![50.0, 50.0]));
}

#[test]
fn plain_vector_track_deserializes_from_static() {
    let p: DimProperty = serde_json::from_str(r#"{"static": [1.0, 2.0]}"#).unwrap();
    assert_eq!(p.value_at(0.0), Some(vec![1.0, 2.0]));
}

use super::*;

#[test]
fn builder_assembles_project_with_overrides() {
    let project = ProjectBuilder::new(25.0, 10.0)
        .resolution(640, 360)
        .video_asset("v", true)
        .unwrap()
        .audio_asset("a")
        .unwrap()
        .track(
            TrackBuilder::new("main", TrackKind::Video)
                .layer(1)
                .clip(ClipBuilder::new("c1", "v", 0.0, 5.0).build().unwrap())
                .build()
                .unwrap(),
        )
        .audio_time_warp(
            "c1",
            TimeWarpDef {
                mode: Default::default(),
                segments: vec![],
            },
        )
        .build()
        .unwrap();

    assert_eq!(project.meta.resolution.width, 640);
    assert_eq!(project.assets.get("v").unwrap().id, "v");
    assert_eq!(project.timeline.tracks[0].layer, 1);
    let ov = project.clip_override("c1").unwrap();
    assert!(ov.audio.as_ref().unwrap().time_warp.is_some());
}

#[test]
fn duplicate_asset_ids_are_rejected() {
    let err = ProjectBuilder::new(30.0, 1.0)
        .audio_asset("a")
        .unwrap()
        .audio_asset("a")
        .err()
        .unwrap();
    assert!(err.to_string().contains("duplicate asset id"));
}

#[test]
fn empty_ids_and_bad_fps_are_rejected() {
    assert!(TrackBuilder::new(" ", TrackKind::Audio).build().is_err());
    assert!(ClipBuilder::new("", "a", 0.0, 1.0).build().is_err());
    assert!(ClipBuilder::new("c", "", 0.0, 1.0).build().is_err());
    assert!(ProjectBuilder::new(0.0, 1.0).build().is_err());
    assert!(ProjectBuilder::new(f64::NAN, 1.0).build().is_err());
}

#[test]
fn no_overrides_means_no_adjustments() {
    let project = ProjectBuilder::new(30.0, 1.0).build().unwrap();
    assert!(project.adjustments.is_none());
}

use super::*;

const PROJECT_JSON: &str = r#"{
  "meta": { "fps": 30, "durationSeconds": 4.0, "resolution": { "width": 1280, "height": 720 } },
  "assets": {
    "assetsById": {
      "v1": { "id": "v1", "type": "video", "hasAudio": true, "durationSeconds": 12.0 },
      "a1": { "id": "a1", "type": "audio" },
      "t1": { "id": "t1", "type": "lottie" }
    }
  },
  "timeline": {
    "tracks": [
      {
        "id": "main",
        "type": "video",
        "layer": 0,
        "clips": [
          {
            "id": "c1",
            "asset": "v1",
            "time": { "start": 0, "end": 2 },
            "sourceRange": { "start": 1, "end": 3 },
            "transitionOut": { "type": "crossfade", "duration": 0.5, "easing": "easeInOut" }
          }
        ]
      },
      { "id": "captions", "type": "text", "layer": 3, "clips": [] },
      {
        "id": "music",
        "type": "audio",
        "audio": { "gain": 0.8, "ducking": { "sidechainTrackId": "main", "amount": 0.6 } },
        "clips": [ { "id": "m1", "asset": "a1", "time": { "start": 0, "end": 4 } } ]
      }
    ]
  },
  "adjustments": {
    "clipOverrides": {
      "m1": {
        "audio": {
          "gain": 0.5,
          "maintainPitch": true,
          "timeWarp": { "mode": "ramp", "segments": [ { "start": 1, "end": 2, "speed": 2, "easing": "linear" } ] }
        }
      }
    }
  }
}"#;

#[test]
fn parses_editor_project_json() {
    let p = Project::from_json_str(PROJECT_JSON).unwrap();
    assert_eq!(p.meta.fps, 30.0);
    assert_eq!(p.meta.resolution.width, 1280);
    assert_eq!(p.assets.get("v1").unwrap().kind, AssetKind::Video);
    assert!(p.assets.get("v1").unwrap().has_audio);
    assert_eq!(p.assets.get("t1").unwrap().kind, AssetKind::Other);
    assert_eq!(p.timeline.tracks.len(), 3);
    assert_eq!(p.timeline.tracks[1].kind, TrackKind::Other);

    let c1 = &p.timeline.tracks[0].clips[0];
    let tr = c1.transition_out.as_ref().unwrap();
    assert_eq!(tr.kind, "crossfade");
    assert_eq!(tr.easing, Some(Ease::InOutQuad));
    assert_eq!(c1.source_range.unwrap().start, 1.0);

    let ducking = p.timeline.tracks[2]
        .audio
        .as_ref()
        .unwrap()
        .ducking
        .as_ref()
        .unwrap();
    assert_eq!(ducking.sidechain_track_id, "main");
    assert_eq!(ducking.attack, 0.05);

    let ov = p.clip_override("m1").unwrap().audio.as_ref().unwrap();
    assert_eq!(ov.maintain_pitch, Some(true));
    assert_eq!(ov.time_warp.as_ref().unwrap().mode, TimeWarpMode::Ramp);
    assert!(p.clip_override("c1").is_none());
}

#[test]
fn json_roundtrip_preserves_project() {
    let p = Project::from_json_str(PROJECT_JSON).unwrap();
    let text = p.to_json_string().unwrap();
    let back = Project::from_json_str(&text).unwrap();
    assert_eq!(p, back);
}

#[test]
fn invalid_json_is_a_serde_error() {
    let err = Project::from_json_str("{ \"meta\": 1 }").unwrap_err();
    assert!(matches!(err, VeirError::Serde(_)));
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = Project::from_path("target/definitely/missing/project.json").unwrap_err();
    assert!(err.to_string().contains("missing/project.json"));
}

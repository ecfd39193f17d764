use approx::assert_abs_diff_eq;
use speedtrack::replay::{read_frames, write_frame};
use speedtrack::{Detection, Frame, SpeedConfig, SpeedTracker, SqliteSink};
use std::path::Path;

fn store_config(db: &Path, scale: f64, window: usize) -> SpeedConfig {
    SpeedConfig {
        scale_factor: scale,
        window_size: window,
        storage_path: Some(db.to_path_buf()),
        ..Default::default()
    }
}

fn frame(t: f64, top: f64) -> Frame {
    Frame::new(t, vec![Detection::new(1, 0.0, top, 10.0, 10.0)])
}

#[test]
fn moving_object_writes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vehicles.db");

    let mut tracker = SpeedTracker::open(store_config(&db, 1.0, 3));
    assert!(tracker.is_persisting());

    tracker.process_frame(&frame(0.0, 0.0));
    tracker.process_frame(&frame(1.0, 20.0));
    drop(tracker);

    let rows = SqliteSink::open(&db).unwrap().records().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].track_id, 1);
    assert_abs_diff_eq!(rows[0].timestamp, 1.0);
    assert_abs_diff_eq!(rows[0].speed, 20.0, epsilon = 1e-9);
}

#[test]
fn window_smooths_jittery_positions() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vehicles.db");

    let mut tracker = SpeedTracker::open(store_config(&db, 1.0, 3));
    tracker.process_frame(&frame(0.0, 0.0));
    tracker.process_frame(&frame(1.0, 21.0));
    tracker.process_frame(&frame(2.0, 39.0));
    drop(tracker);

    let sink = SqliteSink::open(&db).unwrap();
    let rows = sink.records().unwrap();

    assert_eq!(sink.count().unwrap(), 2);
    assert_abs_diff_eq!(rows[0].speed, 21.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rows[1].speed, 19.5, epsilon = 1e-9);
}

#[test]
fn restarted_session_appends_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vehicles.db");

    for _ in 0..2 {
        let mut tracker = SpeedTracker::open(store_config(&db, 1.0, 2));
        tracker.process_frame(&frame(0.0, 0.0));
        tracker.process_frame(&frame(1.0, 5.0));
    }

    let rows = SqliteSink::open(&db).unwrap().records().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], rows[1]);
}

#[test]
fn replayed_log_matches_live_processing() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vehicles.db");

    // two cars: one at 15 m/s, one parked, 20 px per meter, 25 fps
    let frames: Vec<Frame> = (0..25)
        .map(|k| {
            let t = k as f64 * 0.04;
            Frame::new(
                t,
                vec![
                    Detection::new(11, 300.0 * t, 200.0, 40.0, 20.0),
                    Detection::from_ltrb(12, 600.0, 400.0, 640.0, 420.0),
                ],
            )
        })
        .collect();

    let mut log = Vec::new();
    for f in &frames {
        write_frame(&mut log, f).unwrap();
    }

    let mut tracker = SpeedTracker::open(store_config(&db, 20.0, 5));
    let mut emitted = 0;
    for f in read_frames(log.as_slice()) {
        emitted += tracker.process_frame(&f.unwrap()).len();
    }
    drop(tracker);

    let rows = SqliteSink::open(&db).unwrap().records().unwrap();
    assert_eq!(emitted, 24);
    assert_eq!(rows.len(), 24);
    assert!(rows.iter().all(|r| r.track_id == 11));
    for r in &rows {
        assert_abs_diff_eq!(r.speed, 15.0, epsilon = 1e-6);
    }
}

#[test]
fn ground_plane_projection_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("speedtrack.toml");
    std::fs::write(
        &cfg_path,
        "scale_factor = 1.0\nwindow_size = 2\nhomography = \"0.1 0 0; 0 0.1 0; 0 0 1\"\n",
    )
    .unwrap();

    let mut cfg = SpeedConfig::load(&cfg_path).unwrap();
    cfg.storage_path = None;

    let mut tracker = SpeedTracker::open(cfg);
    tracker.process_frame(&frame(0.0, 0.0));
    let out = tracker.process_frame(&frame(0.5, 50.0));

    // 50 px -> 5 m in 0.5 s
    assert_eq!(out.len(), 1);
    assert_abs_diff_eq!(out[0].speed, 10.0, epsilon = 1e-9);
}

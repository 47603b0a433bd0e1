use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rayos_handsfree::calibration::{CalibrationPoint, CalibrationTarget};
use rayos_handsfree::config::{GazeSettings, HandSettings};
use rayos_handsfree::gaze::GazeMapping;
use rayos_handsfree::{
    face_indices, hand_indices, FaceLandmarks, FrameSize, GazeController, HandGestureController, HandLandmarks,
    Handedness, LandmarkFrame, Point2, ScreenSize,
};

const FRAME: FrameSize = FrameSize {
    width: 640,
    height: 480,
};

fn mapping() -> GazeMapping {
    let corners: Vec<CalibrationPoint> = CalibrationTarget::ORDER
        .iter()
        .zip([(0.3, 0.3), (0.7, 0.3), (0.7, 0.7), (0.3, 0.7), (0.5, 0.5)])
        .map(|(&target, (x, y))| CalibrationPoint {
            target,
            iris: Point2::new(x, y),
        })
        .collect();
    GazeMapping::from_points(&corners).expect("four corners")
}

fn open_face() -> FaceLandmarks {
    let mut points = vec![Point2::new(0.5, 0.5); face_indices::IRIS + 1];
    for (eye, cx) in [(face_indices::LEFT_EYE, 0.35), (face_indices::RIGHT_EYE, 0.65)] {
        points[eye[0]] = Point2::new(cx - 0.05, 0.4);
        points[eye[3]] = Point2::new(cx + 0.05, 0.4);
        points[eye[1]] = Point2::new(cx - 0.02, 0.385);
        points[eye[5]] = Point2::new(cx - 0.02, 0.415);
        points[eye[2]] = Point2::new(cx + 0.02, 0.385);
        points[eye[4]] = Point2::new(cx + 0.02, 0.415);
    }
    FaceLandmarks::new(points)
}

fn bench_mapping(c: &mut Criterion) {
    let mapping = mapping();
    let screen = ScreenSize::default();
    c.bench_function("gaze_map", |b| {
        b.iter(|| mapping.map(black_box(Point2::new(0.42, 0.61)), screen))
    });
}

fn bench_gaze_frame(c: &mut Criterion) {
    let mut controller = GazeController::new(GazeSettings::default(), ScreenSize::default());
    let frame = LandmarkFrame {
        timestamp: 0.0,
        size: FRAME,
        landmarks: Some(open_face()),
    };
    let mut t = 0.0;
    c.bench_function("gaze_process", |b| {
        b.iter(|| {
            t += 0.03;
            let frame = LandmarkFrame { timestamp: t, ..frame.clone() };
            black_box(controller.process(&frame))
        })
    });
}

fn bench_hand_frame(c: &mut Criterion) {
    let mut controller = HandGestureController::new(&HandSettings::default(), ScreenSize::default());
    let mut points = vec![Point2::new(0.5, 0.5); hand_indices::COUNT];
    points[hand_indices::MIDDLE_TIP] = Point2::new(0.5, 0.52);
    let frame = LandmarkFrame {
        timestamp: 0.0,
        size: FRAME,
        landmarks: vec![
            HandLandmarks::new(Handedness::Left, vec![Point2::new(0.3, 0.4); hand_indices::COUNT]),
            HandLandmarks::new(Handedness::Right, points),
        ],
    };
    c.bench_function("hand_process", |b| b.iter(|| black_box(controller.process(&frame))));
}

criterion_group!(benches, bench_mapping, bench_gaze_frame, bench_hand_frame);
criterion_main!(benches);

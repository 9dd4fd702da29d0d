use std::{fs, path::Path, rc::Rc, time::Duration};

use crossbeam_channel::Receiver;
use serde_json::json;
use skeletal_gestures::{
    Configuration, EventId, FrameData, GestureId, JointId, ManualClock, Observation, Session,
    SessionNotification, SkeletonData, StateId, TrackingContext, TrackingParameters, Vector3,
    features::BodyFeatures,
    fsm::{GestureRecognized, StateChanged},
    persistence::TemplateStore,
    states::RecordingEvent,
};

const BODY: u32 = 11;

fn body_with_right_hand(x: f64, y: f64) -> SkeletonData {
    SkeletonData::new(BODY)
        .with_joint(JointId::ShoulderLeft, Vector3::new(-0.5, 0.0, 2.0))
        .with_joint(JointId::ShoulderRight, Vector3::new(0.5, 0.0, 2.0))
        .with_joint(JointId::Head, Vector3::new(0.0, 0.5, 2.0))
        .with_joint(JointId::HandLeft, Vector3::new(-0.6, -0.9, 2.0))
        .with_joint(JointId::ElbowRight, Vector3::new(0.6, 0.1, 2.0))
        .with_joint(JointId::WristRight, Vector3::new(0.6, 0.4, 2.0))
        .with_joint(JointId::HandRight, Vector3::new(x, y, 2.0))
}

fn frame(body: SkeletonData) -> FrameData {
    FrameData::new(0, vec![body])
}

fn raised_hand() -> FrameData {
    frame(body_with_right_hand(0.6, 0.8))
}

fn swipe_bodies() -> Vec<SkeletonData> {
    [-0.2, 0.6, 1.4]
        .into_iter()
        .map(|x| body_with_right_hand(x, 0.6))
        .collect()
}

/// Observations of `bodies` as seen with the right hand as cue.
fn right_hand_observations(bodies: &[SkeletonData]) -> Vec<Observation> {
    let mut context = TrackingContext::new(TrackingParameters::default());
    context.current_cue = Some(JointId::HandRight);
    bodies
        .iter()
        .map(|body| {
            BodyFeatures::for_context(body, &context)
                .observation()
                .expect("shoulders present")
                .to_vec()
        })
        .collect()
}

fn write_config(dir: &Path) -> Configuration {
    let store = TemplateStore::new(dir.join("gestures"));
    store
        .save(&GestureId::new("Swipe"), &right_hand_observations(&swipe_bodies()))
        .unwrap();

    let document = json!({
        "gestures_folder": "gestures",
        "tracking": {
            "mode": "2d",
            "min_frames": 3,
            "max_frames": 4,
            "skip_frames": 1,
            "idle_timeout_secs": 1.0,
            "pre_recording_delay_secs": 0.5
        },
        "states": ["Idle", "WaitingForCommand", "Recording"],
        "gestures": [{ "id": "Swipe", "file": "gesture_Swipe.json" }],
        "gesture_transitions": [
            { "from_state": "WaitingForCommand", "on_gesture": "Swipe", "raise_event": "Record" }
        ],
        "state_transitions": [
            { "from_state": "Unknown", "on_event": "GoIdle", "to_state": "Idle" },
            { "from_state": "Idle", "on_event": "WaitForCommand", "to_state": "WaitingForCommand" },
            { "from_state": "WaitingForCommand", "on_event": "GoIdle", "to_state": "Idle" },
            { "from_state": "WaitingForCommand", "on_event": "Record", "to_state": "Recording" },
            { "from_state": "Recording", "on_event": "GoIdle", "to_state": "Idle" }
        ],
        "gesture_settings": {
            "general": { "first_threshold": 0.5, "match_threshold": 0.5, "max_slope": 3.0 }
        }
    });
    let path = dir.join("config.json");
    fs::write(&path, document.to_string()).unwrap();
    Configuration::load(&path).unwrap()
}

struct Harness {
    _dir: tempfile::TempDir,
    clock: Rc<ManualClock>,
    session: Session,
    notifications: Receiver<SessionNotification>,
    config: Configuration,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let clock = Rc::new(ManualClock::new());
        let mut session = Session::with_clock(&config, clock.clone()).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        session.forward_notifications(tx);
        session.start().unwrap();

        Harness {
            _dir: dir,
            clock,
            session,
            notifications: rx,
            config,
        }
    }

    fn feed(&mut self, frame: &FrameData) {
        self.session.process_frame(frame).unwrap();
    }

    fn drain(&self) -> Vec<SessionNotification> {
        self.notifications.try_iter().collect()
    }
}

fn changed(old: StateId, new: StateId) -> SessionNotification {
    SessionNotification::StateChanged(StateChanged { old, new })
}

#[test]
fn raised_hand_arms_recognition_and_timeout_disarms_it() {
    let mut h = Harness::new();
    assert_eq!(h.drain(), [changed(StateId::Unknown, StateId::Idle)]);

    h.feed(&raised_hand());
    assert_eq!(h.session.current_state(), StateId::WaitingForCommand);
    assert_eq!(h.session.context().current_cue, Some(JointId::HandRight));

    h.clock.advance(Duration::from_millis(1500));
    h.feed(&frame(body_with_right_hand(0.6, -0.9)));

    assert_eq!(h.session.current_state(), StateId::Idle);
    assert_eq!(h.session.context().current_cue, None);
    assert_eq!(
        h.drain(),
        [
            changed(StateId::Idle, StateId::WaitingForCommand),
            changed(StateId::WaitingForCommand, StateId::Idle),
        ]
    );
}

#[test]
fn other_bodies_cannot_interrupt_the_active_one() {
    let mut h = Harness::new();
    h.feed(&raised_hand());

    let mut stranger = body_with_right_hand(0.6, 0.8);
    stranger.tracking_id = BODY + 1;
    for _ in 0..5 {
        h.feed(&frame(stranger.clone()));
    }
    assert_eq!(h.session.current_state(), StateId::WaitingForCommand);
    assert_eq!(h.session.context().active_body().unwrap(), BODY);
}

#[test]
fn recognized_swipe_is_reported_after_the_transition() {
    let mut h = Harness::new();
    h.feed(&raised_hand());
    h.drain();

    let swipe = swipe_bodies();
    for body in &swipe {
        h.feed(&frame(body.clone()));
    }
    assert_eq!(h.session.current_state(), StateId::WaitingForCommand);

    // holding the final pose completes the buffer
    h.feed(&frame(swipe[2].clone()));
    assert_eq!(h.session.current_state(), StateId::Recording);

    let notifications = h.drain();
    let state_changed = notifications
        .iter()
        .position(|n| *n == changed(StateId::WaitingForCommand, StateId::Recording))
        .expect("state change reported");
    let recognized = notifications
        .iter()
        .position(|n| matches!(n, SessionNotification::GestureRecognized(_)))
        .expect("gesture reported");
    assert!(state_changed < recognized);

    match &notifications[recognized] {
        SessionNotification::GestureRecognized(GestureRecognized { gesture, event }) => {
            assert_eq!(gesture.id, GestureId::new("Swipe"));
            assert_eq!(*event, EventId::Record);
            assert!(gesture.min_distance.abs() < 1e-9);
        }
        other => panic!("unexpected notification {other:?}"),
    }
}

#[test]
fn recording_waits_for_the_delay_and_saves_a_reloadable_template() {
    let mut h = Harness::new();
    h.feed(&raised_hand());
    h.session.start_recording(GestureId::new("Wave")).unwrap();
    assert_eq!(h.session.current_state(), StateId::Recording);

    h.feed(&raised_hand());
    h.clock.advance(Duration::from_millis(400));
    h.feed(&raised_hand());
    assert!(
        !h.drain()
            .iter()
            .any(|n| matches!(n, SessionNotification::Recording(RecordingEvent::FrameRecorded { .. })))
    );

    h.clock.advance(Duration::from_millis(100));
    for y in [0.8, 0.7, 0.6, 0.5] {
        h.feed(&frame(body_with_right_hand(0.6, y)));
    }
    let counts: Vec<usize> = h
        .drain()
        .into_iter()
        .filter_map(|n| match n {
            SessionNotification::Recording(RecordingEvent::FrameRecorded { frame_count, .. }) => {
                Some(frame_count)
            }
            _ => None,
        })
        .collect();
    assert_eq!(counts, [1, 2, 3, 4]);

    // the buffer is full, the next frame ends the recording
    h.feed(&raised_hand());
    assert_eq!(h.session.current_state(), StateId::Idle);

    let frames = h
        .drain()
        .into_iter()
        .find_map(|n| match n {
            SessionNotification::Recording(RecordingEvent::Stopped { gesture, frames }) => {
                assert_eq!(gesture, GestureId::new("Wave"));
                Some(frames)
            }
            _ => None,
        })
        .expect("recording stopped");
    assert_eq!(frames.len(), 4);

    let store = h.config.template_store();
    store.save(&GestureId::new("Wave"), &frames).unwrap();
    let reloaded = store.load(&TemplateStore::file_name_for(&GestureId::new("Wave"))).unwrap();
    assert_eq!(reloaded.frames, frames);
}

fn stopped_labels(notifications: Vec<SessionNotification>) -> Vec<GestureId> {
    notifications
        .into_iter()
        .filter_map(|n| match n {
            SessionNotification::Recording(RecordingEvent::Stopped { gesture, .. }) => {
                Some(gesture)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn gesture_triggered_recording_does_not_inherit_the_previous_label() {
    let mut h = Harness::new();
    h.feed(&raised_hand());
    h.session.start_recording(GestureId::new("Wave")).unwrap();
    h.clock.advance(Duration::from_millis(500));
    for _ in 0..5 {
        h.feed(&raised_hand());
    }
    assert_eq!(h.session.current_state(), StateId::Idle);
    assert_eq!(stopped_labels(h.drain()), [GestureId::new("Wave")]);

    h.feed(&raised_hand());
    assert_eq!(h.session.current_state(), StateId::WaitingForCommand);
    let swipe = swipe_bodies();
    for body in swipe.iter().chain([&swipe[2]]) {
        h.feed(&frame(body.clone()));
    }
    assert_eq!(h.session.current_state(), StateId::Recording);

    h.clock.advance(Duration::from_millis(500));
    for _ in 0..5 {
        h.feed(&raised_hand());
    }
    assert_eq!(h.session.current_state(), StateId::Idle);

    let notifications = h.drain();
    assert!(notifications.iter().any(|n| matches!(
        n,
        SessionNotification::Recording(RecordingEvent::Starting { gesture }) if gesture.is_unknown()
    )));
    let labels = stopped_labels(notifications);
    assert_eq!(labels.len(), 1);
    assert!(labels[0].is_unknown());
}

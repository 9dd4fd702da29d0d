use std::{
    fs,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;

use super::SessionInput;
use crate::types::FrameData;

/// Producer thread replaying recorded skeleton frames into a session.
#[derive(Debug)]
pub struct ReplayStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReplayStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Waits until every frame has been handed over.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reads a JSON array of frames.
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<FrameData>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read frames from {}", path.display()))?;
    let frames: Vec<FrameData> = serde_json::from_str(&json)
        .with_context(|| format!("failed to decode frames in {}", path.display()))?;
    Ok(frames)
}

/// Feeds the frames of `path` into `tx`, one every `frame_interval`, and
/// sends [`SessionInput::Shutdown`] after the last one.
pub fn start_replay_stream(
    path: impl AsRef<Path>,
    tx: Sender<SessionInput>,
    frame_interval: Duration,
) -> Result<ReplayStream> {
    // Fail fast before spawning the replay thread.
    let frames = load_frames(path)?;
    log::info!("replaying {} frames", frames.len());

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        for frame in frames {
            if stop_flag.load(Ordering::Relaxed) {
                log::debug!("replay stopped at frame {}", frame.frame_number);
                return;
            }
            if tx.send(SessionInput::Frame(frame)).is_err() {
                log::debug!("session is gone, ending replay");
                return;
            }
            if !frame_interval.is_zero() {
                thread::sleep(frame_interval);
            }
        }
        let _ = tx.send(SessionInput::Shutdown);
    });

    Ok(ReplayStream {
        stop,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Body, JointId, SkeletonData, Vector3};

    fn write_frames(dir: &Path, count: u64) -> std::path::PathBuf {
        let frames: Vec<FrameData> = (0..count)
            .map(|n| {
                FrameData::new(
                    n,
                    vec![SkeletonData::new(1).with_joint(JointId::Head, Vector3::new(0.0, 0.5, 2.0))],
                )
            })
            .collect();
        let path = dir.join("frames.json");
        fs::write(&path, serde_json::to_string(&frames).unwrap()).unwrap();
        path
    }

    #[test]
    fn frames_are_replayed_in_order_then_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_frames(dir.path(), 3);
        let (tx, rx) = crossbeam_channel::unbounded();

        start_replay_stream(&path, tx, Duration::ZERO).unwrap().join();

        let inputs: Vec<_> = rx.try_iter().collect();
        assert_eq!(inputs.len(), 4);
        for (n, input) in inputs[..3].iter().enumerate() {
            match input {
                SessionInput::Frame(frame) => assert_eq!(frame.frame_number, n as u64),
                other => panic!("unexpected input {other:?}"),
            }
        }
        assert!(matches!(inputs[3], SessionInput::Shutdown));
    }

    #[test]
    fn unreadable_replay_fails_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = crossbeam_channel::unbounded();
        assert!(start_replay_stream(dir.path().join("missing.json"), tx, Duration::ZERO).is_err());
    }

    #[test]
    fn minimal_frame_documents_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.json");
        fs::write(
            &path,
            r#"[{"bodies": [{"tracking_id": 4, "joints": {"Head": {"x": 0.0, "y": 0.5, "z": 2.0}}}]}]"#,
        )
        .unwrap();

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames[0].frame_number, 0);
        assert_eq!(frames[0].bodies[0].tracking_id, 4);
        assert!(frames[0].bodies[0].is_tracked());
    }
}

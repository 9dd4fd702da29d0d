//! Threaded plumbing around a [`Session`]: frames and commands come in over
//! one channel, notifications leave over another.

pub mod sensor;

use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::{
    config::Configuration,
    error::SessionError,
    session::{Session, SessionNotification},
    types::{FrameData, GestureId},
};

#[derive(Clone, Debug)]
pub enum SessionInput {
    Frame(FrameData),
    /// Start recording the given gesture once a cue is selected.
    Record(GestureId),
    Shutdown,
}

fn run_session_loop(
    mut session: Session,
    input_rx: Receiver<SessionInput>,
) -> Result<(), SessionError> {
    while let Ok(input) = input_rx.recv() {
        match input {
            SessionInput::Frame(frame) => {
                if let Err(err) = session.process_frame(&frame) {
                    log::error!("frame {} failed: {err}", frame.frame_number);
                    return Err(err);
                }
            }
            SessionInput::Record(gesture) => {
                if let Err(err) = session.start_recording(gesture) {
                    log::warn!("cannot start recording: {err}");
                }
            }
            SessionInput::Shutdown => break,
        }
    }

    log::info!("session ended in {}", session.current_state());
    Ok(())
}

/// Runs a session for `config` on its own thread until [`SessionInput::Shutdown`]
/// arrives, the input channel closes, or the controller fails.
pub fn start_session(
    config: Configuration,
    input_rx: Receiver<SessionInput>,
    notify_tx: Sender<SessionNotification>,
) -> thread::JoinHandle<Result<(), SessionError>> {
    thread::spawn(move || {
        let mut session = Session::new(&config)?;
        session.forward_notifications(notify_tx);
        if let Err(err) = session.start() {
            log::error!("failed to start session: {err}");
            return Err(err);
        }
        run_session_loop(session, input_rx)
    })
}

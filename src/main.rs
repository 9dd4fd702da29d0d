use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{bounded, unbounded};
use skeletal_gestures::{
    Configuration, GestureId, SessionNotification, StateId,
    pipeline::{self, SessionInput, sensor},
    states::RecordingEvent,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

struct Args {
    config: PathBuf,
    frames: PathBuf,
    record: Option<GestureId>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let (Some(config), Some(frames)) = (args.next(), args.next()) else {
        bail!("usage: skeletal-gestures <config.json> <frames.json> [record-label]");
    };
    Ok(Args {
        config: config.into(),
        frames: frames.into(),
        record: args.next().map(GestureId::new),
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let config = Configuration::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let store = config.template_store().clone();

    let (input_tx, input_rx) = bounded(4);
    let (notify_tx, notify_rx) = unbounded();

    let worker = pipeline::start_session(config, input_rx, notify_tx);
    let replay = sensor::start_replay_stream(&args.frames, input_tx.clone(), FRAME_INTERVAL)?;

    let mut pending_record = args.record;
    for notification in notify_rx.iter() {
        match notification {
            SessionNotification::StateChanged(change) => {
                log::info!("{} -> {}", change.old, change.new);
                if change.new == StateId::WaitingForCommand {
                    if let Some(gesture) = pending_record.take() {
                        let _ = input_tx.send(SessionInput::Record(gesture));
                    }
                }
            }
            SessionNotification::GestureRecognized(recognized) => {
                println!("{}", recognized.gesture.display_text());
            }
            SessionNotification::Recording(RecordingEvent::Stopped { gesture, frames }) => {
                if frames.is_empty() {
                    log::warn!("recording of {gesture} captured no frames");
                    continue;
                }
                if gesture.is_unknown() {
                    log::warn!("unlabelled recording of {} frames not saved", frames.len());
                    continue;
                }
                let path = store
                    .save(&gesture, &frames)
                    .with_context(|| format!("failed to save recording of {gesture}"))?;
                println!("saved {gesture} to {}", path.display());
            }
            SessionNotification::Recording(event) => {
                log::debug!("recording {}: {event:?}", event.gesture());
            }
        }
    }

    replay.stop();
    drop(input_tx);
    match worker.join() {
        Ok(result) => result.context("session failed")?,
        Err(_) => bail!("session thread panicked"),
    }
    Ok(())
}

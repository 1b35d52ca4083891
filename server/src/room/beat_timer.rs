use std::{sync::Weak, time::Duration};

use tokio::{
    sync::Mutex,
    task::AbortHandle,
    time::{self, MissedTickBehavior},
};

use super::metronome_room::MetronomeRoom;

/// [BeatTimer] owns the single repeating task which drives the beats of a
/// running room. Dropping the handle aborts the task, so replacing a timer or
/// tearing a room down can never leave the old task ticking.
#[derive(Debug)]
pub struct BeatTimer {
    abort_handle: AbortHandle,
}

impl BeatTimer {
    /// Spawn a repeating task emitting one beat per `period` into the room,
    /// cycling through `beats_per_bar` beat indexes starting at 0. The first
    /// beat fires immediately.
    ///
    /// The task holds the room weakly and re-checks under the room lock that
    /// it still is the room's current timer before every emission, so a beat
    /// can never fire after the room was stopped, restarted with a fresh
    /// timer, or destroyed. The bar length is the one captured here; a later
    /// `update_time_signature` does not reach a running timer.
    pub(super) fn arm(
        room: Weak<Mutex<MetronomeRoom>>,
        period: Duration,
        beats_per_bar: u32,
        epoch: u64,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            // a stalled process must not replay the beats it missed
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut beat: u32 = 0;
            loop {
                interval.tick().await;

                let Some(room) = room.upgrade() else {
                    break;
                };
                {
                    let mut room = room.lock().await;
                    if !room.is_running() || room.timer_epoch() != epoch {
                        break;
                    }
                    room.emit_beat(beat);
                }

                beat = (beat + 1) % beats_per_bar;
            }
        });

        BeatTimer {
            abort_handle: task.abort_handle(),
        }
    }
}

impl Drop for BeatTimer {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

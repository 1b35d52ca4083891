use std::{ops::RangeInclusive, sync::Weak, time::Duration};

use comms::event::{self, Event};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::beat_timer::BeatTimer;

pub const DEFAULT_TEMPO: f64 = 120.0;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Accepted bounds for host supplied parameters. A command carrying a value
/// outside of these is dropped without a reply, like any other unhonorable
/// command.
const TEMPO_RANGE: RangeInclusive<f64> = 10.0..=1000.0;
const BEATS_PER_BAR_RANGE: RangeInclusive<u32> = 1..=64;

const BROADCAST_CHANNEL_CAPACITY: usize = 100;

/// What a joiner needs to know about the room at the moment of joining.
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    pub is_host: bool,
    pub tempo: f64,
    pub beats_per_bar: u32,
}

#[derive(Debug)]
/// [MetronomeRoom] holds the shared metronome state of a single room, its
/// member list and the primary broadcast channel. The first member in join
/// order is the host, the only member whose start/stop/update commands are
/// honored. While running, the room owns the single [BeatTimer] driving its
/// beat broadcasts.
pub struct MetronomeRoom {
    code: String,
    members: Vec<String>,
    tempo: f64,
    beats_per_bar: u32,
    running: bool,
    current_beat: u32,
    beat_timer: Option<BeatTimer>,
    // bumped whenever the armed timer changes, lets a superseded timer task
    // recognize itself and bow out instead of ticking into a restarted room
    timer_epoch: u64,
    broadcast_tx: broadcast::Sender<Event>,
}

impl MetronomeRoom {
    pub fn new(code: &str) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        MetronomeRoom {
            code: String::from(code),
            members: Vec::new(),
            tempo: DEFAULT_TEMPO,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            running: false,
            current_beat: 0,
            beat_timer: None,
            timer_epoch: 0,
            broadcast_tx,
        }
    }

    /// The host is the longest tenured member; membership order decides
    /// succession when the host leaves.
    pub fn host_id(&self) -> Option<&str> {
        self.members.first().map(String::as_str)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.members.iter().any(|member| member == session_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// The beat index the room last emitted, only moving while running.
    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    /// Add a member to the room and broadcast the new member count.
    /// The first member to ever join a room becomes its host.
    ///
    /// # Returns
    ///
    /// - A broadcast receiver for the member to receive room events
    /// - A snapshot of the room state the joiner needs to mirror locally
    pub fn join(&mut self, session_id: &str) -> (broadcast::Receiver<Event>, JoinSnapshot) {
        // subscribe before the count broadcast so the joiner observes its own join
        let broadcast_rx = self.broadcast_tx.subscribe();
        let is_host = self.members.is_empty();

        self.members.push(String::from(session_id));
        self.broadcast_user_count();

        (
            broadcast_rx,
            JoinSnapshot {
                is_host,
                tempo: self.tempo,
                beats_per_bar: self.beats_per_bar,
            },
        )
    }

    /// Remove a member from the room and broadcast the new member count.
    ///
    /// A departing host always halts playback; the next member in join order
    /// becomes the new host and has to start the metronome again explicitly.
    /// Returns false when the given session was not a member.
    pub fn leave(&mut self, session_id: &str) -> bool {
        let Some(position) = self.members.iter().position(|member| member == session_id) else {
            return false;
        };

        self.members.remove(position);
        self.broadcast_user_count();

        if self.members.is_empty() {
            // nobody is left to hear a stop broadcast
            self.disarm();
        } else if position == 0 {
            self.stop_playback();
        }

        true
    }

    /// Arm the beat timer with fresh parameters, replacing a running one.
    /// Only honored for the host, with parameters within accepted bounds.
    pub fn start(
        &mut self,
        self_handle: Weak<Mutex<MetronomeRoom>>,
        session_id: &str,
        tempo: f64,
        beats_per_bar: u32,
    ) {
        if !self.is_host(session_id) {
            return;
        }
        if !is_valid_tempo(tempo) || !is_valid_beats_per_bar(beats_per_bar) {
            return;
        }

        self.tempo = tempo;
        self.beats_per_bar = beats_per_bar;
        self.running = true;
        self.current_beat = 0;

        // at most one live timer per room, the old one is cancelled before arming
        drop(self.beat_timer.take());
        self.timer_epoch += 1;
        self.beat_timer = Some(BeatTimer::arm(
            self_handle,
            Duration::from_secs_f64(60.0 / tempo),
            beats_per_bar,
            self.timer_epoch,
        ));

        debug!(room = %self.code, tempo, beats_per_bar, "metronome started");
        self.broadcast(Event::StateUpdate(event::StateUpdateBroadcastEvent {
            room: self.code.clone(),
            tempo: Some(tempo),
            beats_per_bar: Some(beats_per_bar),
            running: Some(true),
            current_beat: Some(0),
        }));
    }

    /// Stop the metronome. Only honored for the host.
    pub fn stop(&mut self, session_id: &str) {
        if !self.is_host(session_id) {
            return;
        }

        self.stop_playback();
    }

    /// Change the stored tempo without touching a running timer; the new tempo
    /// takes effect on the next start. Only honored for the host, with a tempo
    /// within accepted bounds.
    pub fn update_tempo(&mut self, session_id: &str, tempo: f64) {
        if !self.is_host(session_id) || !is_valid_tempo(tempo) {
            return;
        }

        self.tempo = tempo;
        self.broadcast_settings();
    }

    /// Change the stored time signature without touching a running timer; the
    /// new bar length takes effect on the next start. Only honored for the
    /// host, with a value within accepted bounds.
    pub fn update_time_signature(&mut self, session_id: &str, beats_per_bar: u32) {
        if !self.is_host(session_id) || !is_valid_beats_per_bar(beats_per_bar) {
            return;
        }

        self.beats_per_bar = beats_per_bar;
        self.broadcast_settings();
    }

    /// Emit a single beat and remember it as the room's current position.
    /// Called by the armed [BeatTimer] task while it holds the room lock.
    pub(super) fn emit_beat(&mut self, beat: u32) {
        self.current_beat = beat;
        self.broadcast(Event::Beat(event::BeatBroadcastEvent {
            room: self.code.clone(),
            beat,
        }));
    }

    /// Release the beat timer without telling anyone, used when the room is
    /// being torn down.
    pub(super) fn disarm(&mut self) {
        self.running = false;
        self.timer_epoch += 1;
        // dropping the handle aborts the timer task
        self.beat_timer = None;
    }

    pub(super) fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    fn is_host(&self, session_id: &str) -> bool {
        self.host_id() == Some(session_id)
    }

    /// Halt playback and tell the remaining members about it. The broadcast
    /// goes out even when the metronome was already stopped, keeping every
    /// member converged on the same state.
    fn stop_playback(&mut self) {
        self.disarm();

        debug!(room = %self.code, "metronome stopped");
        self.broadcast(Event::StateUpdate(event::StateUpdateBroadcastEvent {
            room: self.code.clone(),
            tempo: Some(self.tempo),
            beats_per_bar: Some(self.beats_per_bar),
            running: Some(false),
            current_beat: None,
        }));
    }

    fn broadcast_settings(&self) {
        self.broadcast(Event::StateUpdate(event::StateUpdateBroadcastEvent {
            room: self.code.clone(),
            tempo: Some(self.tempo),
            beats_per_bar: Some(self.beats_per_bar),
            running: None,
            current_beat: None,
        }));
    }

    fn broadcast_user_count(&self) {
        self.broadcast(Event::UserCount(event::UserCountBroadcastEvent {
            room: self.code.clone(),
            count: self.members.len(),
        }));
    }

    // multicast is fire-and-forget, a send only fails when nobody listens
    fn broadcast(&self, event: Event) {
        let _ = self.broadcast_tx.send(event);
    }
}

fn is_valid_tempo(tempo: f64) -> bool {
    // an inclusive range rejects NaN and the infinities on its own
    TEMPO_RANGE.contains(&tempo)
}

fn is_valid_beats_per_bar(beats_per_bar: u32) -> bool {
    BEATS_PER_BAR_RANGE.contains(&beats_per_bar)
}

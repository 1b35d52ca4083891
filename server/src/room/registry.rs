use std::{collections::HashMap, sync::Arc};

use comms::event::Event;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use super::metronome_room::{JoinSnapshot, MetronomeRoom};

/// [RoomRegistry] owns every live room, keyed by room code. Rooms are created
/// lazily on first join and destroyed the moment their last member leaves, so
/// an existing room always has at least one member.
///
/// Commands which cannot be honored, because the session is in no room or is
/// not the host of its room, are absorbed as no-ops here and in the room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Mutex<MetronomeRoom>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry::default()
    }

    /// Join a session into the room with the given code, creating the room
    /// with default state when it does not exist yet.
    ///
    /// # Returns
    ///
    /// - A broadcast receiver for the session to receive room events
    /// - A snapshot of the room state for the join reply
    pub async fn join_room(
        &self,
        code: &str,
        session_id: &str,
    ) -> (broadcast::Receiver<Event>, JoinSnapshot) {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(String::from(code)).or_insert_with(|| {
            info!(room = code, "creating room");
            Arc::new(Mutex::new(MetronomeRoom::new(code)))
        });

        let mut room = room.lock().await;
        room.join(session_id)
    }

    /// Remove a session from the room with the given code, destroying the
    /// room when it ends up empty. Returns false when the room does not exist
    /// or the session was not a member of it.
    pub async fn leave_room(&self, code: &str, session_id: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(code) else {
            return false;
        };

        let (removed, now_empty) = {
            let mut room = room.lock().await;
            let removed = room.leave(session_id);
            (removed, room.is_empty())
        };

        if now_empty {
            rooms.remove(code);
            info!(room = code, "destroying empty room");
        }

        removed
    }

    /// Remove a session from whichever room currently holds it, used for
    /// implicit departures when a connection goes away.
    pub async fn leave_any(&self, session_id: &str) -> bool {
        let Some(code) = self.find_room_of(session_id).await else {
            return false;
        };

        self.leave_room(&code, session_id).await
    }

    /// Find the code of the room a session currently belongs to. A session
    /// belongs to at most one room at a time, the session coordinator enforces
    /// this on join.
    pub async fn find_room_of(&self, session_id: &str) -> Option<String> {
        let rooms = self.rooms.lock().await;
        for (code, room) in rooms.iter() {
            if room.lock().await.contains(session_id) {
                return Some(code.clone());
            }
        }

        None
    }

    /// Start the metronome of the room the session belongs to.
    pub async fn start_metronome(&self, session_id: &str, tempo: f64, beats_per_bar: u32) {
        let Some(room) = self.find_room_arc(session_id).await else {
            return;
        };

        let mut guard = room.lock().await;
        guard.start(Arc::downgrade(&room), session_id, tempo, beats_per_bar);
    }

    /// Stop the metronome of the room the session belongs to.
    pub async fn stop_metronome(&self, session_id: &str) {
        if let Some(room) = self.find_room_arc(session_id).await {
            room.lock().await.stop(session_id);
        }
    }

    /// Change the stored tempo of the room the session belongs to.
    pub async fn update_tempo(&self, session_id: &str, tempo: f64) {
        if let Some(room) = self.find_room_arc(session_id).await {
            room.lock().await.update_tempo(session_id, tempo);
        }
    }

    /// Change the stored time signature of the room the session belongs to.
    pub async fn update_time_signature(&self, session_id: &str, beats_per_bar: u32) {
        if let Some(room) = self.find_room_arc(session_id).await {
            room.lock()
                .await
                .update_time_signature(session_id, beats_per_bar);
        }
    }

    /// Disarm every room's timer and drop the rooms. Part of process
    /// shutdown; no timer may keep firing into a torn down registry.
    pub async fn shutdown(&self) {
        let mut rooms = self.rooms.lock().await;
        for room in rooms.values() {
            room.lock().await.disarm();
        }

        rooms.clear();
    }

    async fn find_room_arc(&self, session_id: &str) -> Option<Arc<Mutex<MetronomeRoom>>> {
        let rooms = self.rooms.lock().await;
        for room in rooms.values() {
            if room.lock().await.contains(session_id) {
                return Some(Arc::clone(room));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    #[tokio::test]
    async fn test_rooms_are_created_lazily_and_destroyed_when_empty() {
        let registry = RoomRegistry::new();

        let (_rx, snapshot) = registry.join_room("abcd", "session-a").await;
        assert!(snapshot.is_host);
        assert_eq!(
            registry.find_room_of("session-a").await.as_deref(),
            Some("abcd")
        );

        assert!(registry.leave_room("abcd", "session-a").await);
        assert_eq!(registry.find_room_of("session-a").await, None);

        // a rejoin recreates the room from defaults, the previous host is gone
        let (_rx, snapshot) = registry.join_room("abcd", "session-b").await;
        assert!(snapshot.is_host);
    }

    #[tokio::test]
    async fn test_leave_any_resolves_the_room_of_the_session() {
        let registry = RoomRegistry::new();
        registry.join_room("abcd", "session-a").await;
        registry.join_room("efgh", "session-b").await;

        assert!(registry.leave_any("session-a").await);

        assert_eq!(registry.find_room_of("session-a").await, None);
        assert_eq!(
            registry.find_room_of("session-b").await.as_deref(),
            Some("efgh")
        );
        assert!(!registry.leave_any("session-a").await);
    }

    #[tokio::test]
    async fn test_beats_cycle_through_the_bar() {
        let registry = RoomRegistry::new();
        let (mut rx, _) = registry.join_room("abcd", "session-a").await;

        // 600 bpm keeps the test fast, one beat every 100ms
        registry.start_metronome("session-a", 600.0, 3).await;

        let mut beats = Vec::new();
        while beats.len() < 7 {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Ok(Event::Beat(beat))) => beats.push(beat.beat),
                Ok(Ok(_)) => {}
                other => panic!("beat stream ended unexpectedly: {:?}", other),
            }
        }

        assert_eq!(beats, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[tokio::test]
    async fn test_restart_never_leaks_the_previous_timer() {
        let registry = RoomRegistry::new();
        registry.join_room("abcd", "session-a").await;

        registry.start_metronome("session-a", 600.0, 4).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.start_metronome("session-a", 600.0, 4).await;

        // subscribe after the restart so only post-restart beats are observed;
        // a leaked timer would interleave a second beat sequence here
        let (mut rx, _) = registry.join_room("abcd", "session-b").await;

        let mut beats = Vec::new();
        while beats.len() < 6 {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Ok(Event::Beat(beat))) => beats.push(beat.beat),
                Ok(Ok(_)) => {}
                other => panic!("beat stream ended unexpectedly: {:?}", other),
            }
        }

        for pair in beats.windows(2) {
            assert_eq!(pair[1], (pair[0] + 1) % 4);
        }
    }

    #[tokio::test]
    async fn test_no_beat_is_emitted_after_stop_returns() {
        let registry = RoomRegistry::new();
        let (mut rx, _) = registry.join_room("abcd", "session-a").await;

        registry.start_metronome("session-a", 600.0, 4).await;
        // let a few beats through before stopping
        tokio::time::sleep(Duration::from_millis(250)).await;
        registry.stop_metronome("session-a").await;

        // everything buffered before the stop broadcast is fair game
        loop {
            match rx.recv().await.unwrap() {
                Event::StateUpdate(update) if update.running == Some(false) => break,
                _ => {}
            }
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_timer_dies_with_the_room() {
        let registry = RoomRegistry::new();
        let (mut rx, _) = registry.join_room("abcd", "session-a").await;
        registry.start_metronome("session-a", 600.0, 4).await;

        assert!(registry.leave_any("session-a").await);
        assert_eq!(registry.find_room_of("session-a").await, None);

        // drain what was buffered while running; the channel must be closed
        // and silent afterwards
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_disarms_every_room() {
        let registry = RoomRegistry::new();
        let (mut rx_a, _) = registry.join_room("abcd", "session-a").await;
        let (mut rx_b, _) = registry.join_room("efgh", "session-b").await;
        registry.start_metronome("session-a", 600.0, 4).await;
        registry.start_metronome("session-b", 600.0, 4).await;

        registry.shutdown().await;

        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx_a.try_recv(), Err(TryRecvError::Closed));
        assert_eq!(rx_b.try_recv(), Err(TryRecvError::Closed));
    }
}

use serde::{Deserialize, Serialize};

/// Sent to a session right after its connection is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedReplyEvent {
    /// The server generated id of the session
    #[serde(rename = "s")]
    pub session_id: String,
}

/// Sent to a session after it has joined a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomJoinedReplyEvent {
    /// The code of the room that was joined
    #[serde(rename = "r")]
    pub room: String,
    /// Whether the joiner is the host of the room
    #[serde(rename = "h")]
    pub is_host: bool,
    /// The room's current tempo in beats per minute
    #[serde(rename = "b")]
    pub tempo: f64,
    /// The room's current time signature numerator
    #[serde(rename = "n")]
    pub beats_per_bar: u32,
}

/// The number of members in a room has changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCountBroadcastEvent {
    /// The code of the room the count belongs to
    #[serde(rename = "r")]
    pub room: String,
    /// The number of members currently in the room
    #[serde(rename = "c")]
    pub count: usize,
}

/// A single metronome tick of a running room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatBroadcastEvent {
    /// The code of the room the beat belongs to
    #[serde(rename = "r")]
    pub room: String,
    /// The beat index within the bar, `0..beats_per_bar`
    #[serde(rename = "i")]
    pub beat: u32,
}

/// A partial update of a room's shared metronome state.
/// Fields which did not change with the update are omitted from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdateBroadcastEvent {
    /// The code of the room the state belongs to
    #[serde(rename = "r")]
    pub room: String,
    /// Tempo in beats per minute
    #[serde(rename = "b", skip_serializing_if = "Option::is_none", default)]
    pub tempo: Option<f64>,
    /// Time signature numerator
    #[serde(rename = "n", skip_serializing_if = "Option::is_none", default)]
    pub beats_per_bar: Option<u32>,
    /// Whether the room's metronome is running
    #[serde(rename = "p", skip_serializing_if = "Option::is_none", default)]
    pub running: Option<bool>,
    /// The beat index the room is currently at
    #[serde(rename = "i", skip_serializing_if = "Option::is_none", default)]
    pub current_beat: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
/// Events that can be sent to the client.
/// Reply events are addressed to a single session, Broadcast events to every member of a room.
pub enum Event {
    Connected(ConnectedReplyEvent),
    RoomJoined(RoomJoinedReplyEvent),
    UserCount(UserCountBroadcastEvent),
    Beat(BeatBroadcastEvent),
    StateUpdate(StateUpdateBroadcastEvent),
}

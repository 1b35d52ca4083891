use serde::{Deserialize, Serialize};

/// User Command for joining a metronome room by its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomCommand {
    // The code of the room to join.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for starting the metronome of the caller's room.
/// Only honored when the caller is the host of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartMetronomeCommand {
    // Tempo in beats per minute.
    #[serde(rename = "b")]
    pub tempo: f64,
    // Time signature numerator, the number of beats in a bar.
    #[serde(rename = "n")]
    pub beats_per_bar: u32,
}

/// User Command for stopping the metronome of the caller's room.
/// Only honored when the caller is the host of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopMetronomeCommand;

/// User Command for changing the stored tempo of the caller's room.
/// A running metronome keeps ticking at the tempo it was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTempoCommand {
    // Tempo in beats per minute.
    #[serde(rename = "b")]
    pub tempo: f64,
}

/// User Command for changing the stored time signature of the caller's room.
/// A running metronome keeps the bar length it was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTimeSignatureCommand {
    // Time signature numerator, the number of beats in a bar.
    #[serde(rename = "n")]
    pub beats_per_bar: u32,
}

/// User Command for leaving a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomCommand {
    // The code of the room to leave.
    #[serde(rename = "r")]
    pub room: String,
}

/// User Command for quitting the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A user command which can be sent to the server by a single user session.
/// All commands are processed in the context of the room the session belongs to,
/// resolved by the server rather than trusted from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum UserCommand {
    JoinRoom(JoinRoomCommand),
    StartMetronome(StartMetronomeCommand),
    StopMetronome(StopMetronomeCommand),
    UpdateTempo(UpdateTempoCommand),
    UpdateTimeSignature(UpdateTimeSignatureCommand),
    LeaveRoom(LeaveRoomCommand),
    Quit(QuitCommand),
}

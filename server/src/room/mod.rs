pub use self::metronome_room::JoinSnapshot;
pub use self::registry::RoomRegistry;

mod beat_timer;
mod metronome_room;
mod registry;

pub mod game_service;
pub mod mission;
pub mod room_service;
pub mod scheduler;
pub mod tally;
pub mod visibility;

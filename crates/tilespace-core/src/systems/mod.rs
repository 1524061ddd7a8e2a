//! Systems - logic that operates on components

mod intents;
mod interaction;
mod movement;
mod presence;

pub use intents::*;
pub use interaction::*;
pub use movement::*;
pub use presence::*;

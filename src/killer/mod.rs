// Victim selection and signal delivery

mod selector;
mod signals;

pub use selector::VictimSelector;
pub use signals::{send, KillMode};

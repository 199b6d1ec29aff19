mod bus;
mod recorder;
mod team;

pub use bus::MessageBus;
pub use recorder::CallRecorder;
pub use team::{RunReport, Team, Termination};

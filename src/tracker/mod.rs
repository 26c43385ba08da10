pub mod controller;
pub mod signal;
pub mod state;

pub use controller::SleepTrackerController;
pub use signal::Signal;
pub use state::TrackerSnapshot;

pub mod controller;
pub mod state;

pub use controller::NavigationSession;
pub use state::{Destination, SessionSnapshot, SessionState, ViewportCommand};

//! Navigation: which screen is active and the session it works on.
//!
//! The controller is an explicit state machine: one handler per screen,
//! a forward transition table on [`Screen`], and an explicit back target per
//! screen rather than a history stack. Profile writes carried by events go
//! through the profile accumulator before the screen changes.

pub mod controller;
pub mod screen;
pub mod session;

pub use controller::{NavEvent, NavigationController, Transition};
pub use screen::Screen;
pub use session::{Session, SessionSnapshot};

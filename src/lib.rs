pub mod animator;
pub mod dice;
pub mod dispatcher;
pub mod error;
pub mod gm;
pub mod history;
pub mod protocol;
pub mod registry;
pub mod sequencer;
pub mod session;
pub mod settings;
pub mod socketio;
pub mod test_helpers;
pub mod theme;
pub mod timeline;
pub mod transport;
pub mod tray;

pub use error::{
    Error,
    Result,
};

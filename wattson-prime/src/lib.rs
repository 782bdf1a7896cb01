pub mod api;
pub mod board;
pub mod config;
pub mod snapshot;
pub mod store;
pub mod toggle;

use board::DeviceBoard;

// AppState must be defined in lib.rs to be visible to all modules
#[derive(Clone)]
pub struct AppState<S> {
    pub board: DeviceBoard<S>,
    /// Summary size when a request does not name one
    pub top_devices: usize,
}

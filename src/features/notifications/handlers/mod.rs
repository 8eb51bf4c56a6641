mod notification_handler;
mod ws_handler;

pub use notification_handler::*;
pub use ws_handler::*;

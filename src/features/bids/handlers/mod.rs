mod bid_handler;

pub use bid_handler::*;

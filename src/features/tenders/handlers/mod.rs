mod tender_handler;

pub use tender_handler::*;

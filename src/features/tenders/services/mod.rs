mod tender_service;

pub(crate) use tender_service::{ensure_future, ensure_positive};
pub use tender_service::TenderService;

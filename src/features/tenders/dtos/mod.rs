mod tender_dto;

pub use tender_dto::*;

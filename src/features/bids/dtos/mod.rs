mod bid_dto;

pub use bid_dto::*;

mod bid_service;

pub use bid_service::BidService;

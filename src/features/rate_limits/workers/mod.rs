mod sweeper;

pub use sweeper::RateLimitSweeper;

mod award;
mod tender;

pub use award::*;
pub use tender::*;

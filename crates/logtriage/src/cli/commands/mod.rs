pub mod describe;
pub mod invoke;
pub mod seed;

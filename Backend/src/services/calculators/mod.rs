pub mod geometry;
pub mod ration;

pub use ration::{round2, LotMetrics};

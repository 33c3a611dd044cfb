//! 공용 타입 정의.

pub mod observation;
pub mod timeframe;

pub use observation::{AumSnapshot, Observation, PriceField, TargetWeight};
pub use timeframe::Timeframe;

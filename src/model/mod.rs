mod alarm;
mod metric;
mod statistic;

pub use alarm::*;
pub use metric::*;
pub use statistic::*;

pub mod day;
pub mod metric;
pub mod record;

pub use day::{Day, DayCutoff};
pub use metric::{Metric, MetricInfo};
pub use record::{BodyComposition, BodyCompositionLog, DailyRecord};

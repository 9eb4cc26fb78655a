pub mod context;
pub mod filter;
pub mod intent;
pub mod result;
pub mod work_order;

pub use context::ConversationContext;
pub use filter::FilterSpec;
pub use intent::{CountUnit, Dimension, Intent};
pub use result::{
    AnalyticsResult, CountSubject, DetailEntry, MatchedWorkOrder, RankedEntry, TrendBucket,
    WorkOrderDetail,
};
pub use work_order::{WorkOrderId, WorkOrderRow};

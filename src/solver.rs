mod deadline;
mod dls;
mod table;

pub use deadline::Deadline;
pub use dls::{DepthLimitedSearch, SearchOptions};
pub use table::{BudgetResult, ResultTable};

mod corporate_action;
mod fees;
mod order;
mod portfolio;

pub use corporate_action::XrdRecord;
pub use fees::{Commission, Tax};
pub use order::{BarPrices, EvalOpen, Order, OrderBatch, OrderId, OrderState, PriceEvaluator};
pub use portfolio::{Portfolio, PortfolioPosition};

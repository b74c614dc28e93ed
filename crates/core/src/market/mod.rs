mod snapshot;
mod window;

pub use snapshot::{CommonSnapshot, OhlcBlock, PriceSnapshot};
pub use window::{CommonWindow, Field, PriceWindow};

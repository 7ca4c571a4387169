pub mod attr;
pub mod log;
pub mod span;

pub use attr::{AttrValue, Attributes};
pub use log::FlatLog;
pub use span::FlatSpan;

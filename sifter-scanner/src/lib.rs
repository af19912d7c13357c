pub mod chrome;
pub mod dom;
pub mod error;
pub mod extractor;
pub mod locator;
pub mod pager;
pub mod reconcile;
pub mod result;
pub mod scroller;
pub mod session;
pub mod static_page;
pub mod traversal;

#[cfg(test)]
mod scripted;

pub use chrome::{ChromeConfig, ChromePage};
pub use dom::{ElementHandle, Page};
pub use error::ScanError;
pub use locator::{FieldRule, Locator, LocatorKind, StrategyTable, Transform, ValueSource};
pub use result::{FieldValue, PageProgress, RawRecord, RecordSet, UniformRecord, UNAVAILABLE};
pub use static_page::StaticPage;
pub use traversal::{Traversal, TraversalMode, TraversalOptions, TraversalState, Traverser};

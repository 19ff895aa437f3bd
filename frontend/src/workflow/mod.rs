//! Upload/process/download workflow.
//!
//! - [`files`] - pending files and preview handle discipline
//! - [`controller`] - the state machine driving the extraction backend
//!
//! Nothing here touches the DOM directly: the browser pieces are injected
//! through [`PreviewAllocator`], [`ResultSaver`] and
//! [`ExtractionApi`](crate::services::ExtractionApi), so the workflow runs
//! and is tested natively.

pub mod controller;
pub mod files;

pub use controller::*;
pub use files::*;

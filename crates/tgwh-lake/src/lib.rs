//! The on-disk data lake: where landed batches and downloaded images live,
//! how batches are written, and how they are discovered and parsed again.

pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use error::LakeError;
pub use layout::LakeLayout;
pub use reader::{discover_batches, read_batch, InvalidElement, ParsedBatch};
pub use writer::{LandingWriter, WrittenBatch};

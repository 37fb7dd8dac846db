//! CLI command implementations.
//!
//! - `list` - Show the pieces found in a drawing
//! - `convert` - Write one shape file per piece
//! - `piece` - Rotate, mirror and convert a single piece
//! - `preview` - Render a piece's final outline

pub mod common;
pub mod convert;
pub mod list;
pub mod piece;
pub mod preview;

pub use convert::cmd_convert;
pub use list::cmd_list;
pub use piece::cmd_piece;
pub use preview::cmd_preview;

//! Window layout on top of the Trellis constraint solver.
//!
//! This crate is the thin layer a widget toolkit talks to:
//!
//! 1. **Window**: the root box, pinned to the window size and resizable
//! 2. **Boxes**: six variables per box with their structural constraints
//! 3. **Content sizes**: weak intrinsic sizes that give way to layout
//! 4. **Guidelines**: draggable thin boxes other boxes attach to
//!
//! # Example
//!
//! ```
//! use trellis_constraint::{Attribute, Constraint, Relation, Strength};
//! use trellis_layout::{Window, WindowOptions};
//!
//! let mut window = Window::new(WindowOptions::default())?;
//! let root = window.vars().clone();
//! let panel = window.create_box("panel")?;
//! window.add_constraint(&Constraint::relate(
//!     &panel, Attribute::Left, Relation::Equal, &root, Attribute::Left, 1.0, 10.0, Strength::REQUIRED,
//! ))?;
//! window.set_content_size("panel", 200.0, 100.0)?;
//!
//! let bounds = window.bounds("panel")?;
//! assert!((bounds.right() - 210.0).abs() < 1e-6);
//! # Ok::<(), trellis_layout::LayoutError>(())
//! ```

mod bounds;
mod error;
mod guideline;
mod window;

pub use bounds::Bounds;
pub use error::LayoutError;
pub use guideline::{Guideline, Orientation};
pub use window::{Window, WindowOptions};

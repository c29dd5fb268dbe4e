//! Turning model output into a statement that is safe to run
//!
//! - [`extract`] pulls the first SELECT-shaped span out of free text
//! - [`guard`] enforces a single bounded read-only query

mod extract;
mod guard;

pub use extract::*;
pub use guard::*;

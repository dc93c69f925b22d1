pub mod term;
pub mod triple;

pub use term::{Literal, Numeric, Term, TermComparer};
pub use triple::Triple;

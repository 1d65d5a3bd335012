//! Pipeline step implementations.
//!
//! Each step handles one phase of assembly.

mod concat;
mod finalize;
mod mix;
mod stage;
mod trim;

pub use concat::ConcatStep;
pub use finalize::FinalizeStep;
pub use mix::MixStep;
pub use stage::StageStep;
pub use trim::TrimStep;

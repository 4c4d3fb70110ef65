//! Record types shared by every engine
//!
//! [`SequenceRecord`] is the common currency: alignment records are converted to
//! it by move before they reach an output.

mod alignment_record;
mod sequence_record;

pub use alignment_record::{AlignmentRecord, FLAG_REVERSE};
pub use sequence_record::SequenceRecord;

mod cell;
mod raw;
mod stamp;

pub use cell::{SeqCell, SeqCellWriteGuard};
pub use raw::{SeqMutex, SeqWriteGuard};
pub use stamp::Stamp;

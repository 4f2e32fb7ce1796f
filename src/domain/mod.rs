mod entry;
mod money;
mod origin;
mod payout;
mod record;
mod summary;

pub use entry::*;
pub use money::*;
pub use origin::*;
pub use payout::*;
pub use record::*;
pub use summary::*;

mod archive;
mod bundle;
mod documents;
mod export;
mod format;
mod report;
mod workbook;

pub use archive::*;
pub use bundle::*;
pub use documents::*;
pub use export::*;
pub use format::*;
pub use report::*;
pub use workbook::*;

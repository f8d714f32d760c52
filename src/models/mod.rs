mod code;
mod command;
mod license;
mod options;
mod record;

pub use code::*;
pub use command::*;
pub use license::*;
pub use options::*;
pub use record::*;

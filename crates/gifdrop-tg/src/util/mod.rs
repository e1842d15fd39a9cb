//! Assorted utility functions (missing batteries).
mod std_ext;

pub mod display;
pub mod process;
pub mod temp_file;
pub mod units;

pub(crate) mod prelude {
    pub(crate) use super::std_ext::prelude::*;
}

pub(crate) type DynError = dyn std::error::Error + Send + Sync;
pub(crate) type DynResult<T = (), E = Box<DynError>> = std::result::Result<T, E>;

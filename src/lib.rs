//! Reader for CED Signal (CFS) electrophysiology recordings.
//!
//! Recordings are read through the vendor's native CFS library, bound at
//! run time by [`native::DynamicCfsLibrary`]. Every sweep of every channel
//! is decoded into calibrated `ndarray` buffers when the file is loaded, and
//! [`CfsFile::set_sweep`] exposes one sweep at a time for analysis code.

pub mod config;
pub mod error;
pub mod native;
mod reader;
pub mod settings;
pub mod sweep;
pub mod types;

use std::path::Path;

// Re-export types
pub use config::{EmptyReadPolicy, LoadOptions, TimeOffsetMode};
pub use error::{CfsError, FailedRead, Result};
pub use reader::{reference_file, verify_compatibility};
pub use sweep::{normalize_units, SweepCursor};
pub use types::*;

use native::CfsLibrary;

/// Loads a CFS file with the default [`LoadOptions`].
///
/// # Examples
///
/// ```no_run
/// use cfs_importer::load;
/// use cfs_importer::native::DynamicCfsLibrary;
///
/// let mut lib = DynamicCfsLibrary::open("CFS64.dll")?;
/// let result = load("path/to/your/file.cfs", &mut lib);
/// match result {
///     Ok(cfs) => println!("{} sweeps of {} channels", cfs.sweep_count, cfs.channel_count),
///     Err(e) => println!("Error loading file: {}", e),
/// }
/// # Ok::<(), cfs_importer::CfsError>(())
/// ```
pub fn load<L, P>(file_path: P, lib: &mut L) -> Result<CfsFile>
where
    L: CfsLibrary + ?Sized,
    P: AsRef<Path>,
{
    reader::load_file(file_path, lib, &LoadOptions::default())
}

/// Loads a CFS file with explicit read policies.
///
/// # Examples
///
/// ```no_run
/// use cfs_importer::{load_with_options, EmptyReadPolicy, LoadOptions};
/// use cfs_importer::native::DynamicCfsLibrary;
///
/// let mut lib = DynamicCfsLibrary::open("CFS64.dll")?;
/// let options = LoadOptions {
///     on_empty_read: EmptyReadPolicy::Fail,
///     ..LoadOptions::default()
/// };
/// let cfs = load_with_options("path/to/your/file.cfs", &mut lib, &options)?;
/// # Ok::<(), cfs_importer::CfsError>(())
/// ```
pub fn load_with_options<L, P>(file_path: P, lib: &mut L, options: &LoadOptions) -> Result<CfsFile>
where
    L: CfsLibrary + ?Sized,
    P: AsRef<Path>,
{
    reader::load_file(file_path, lib, options)
}

/// Loads every `.cfs` file in a folder, sorted by file name.
///
/// A path to a single file yields a one-element vector.
pub fn load_folder<L, P>(folder: P, lib: &mut L, options: &LoadOptions) -> Result<Vec<CfsFile>>
where
    L: CfsLibrary + ?Sized,
    P: AsRef<Path>,
{
    reader::load_folder(folder, lib, options)
}

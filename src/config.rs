//! Load configuration.
//!
//! [`LoadOptions`] controls how the importer reacts to incomplete or irregular
//! recordings. [`LoadOptions::default()`] keeps every readable sweep and only
//! reports problems when they are asked for.

/// What to do when the native library returns no points for a channel/sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyReadPolicy {
    /// Leave the sweep out of the channel and record it in
    /// [`CfsFile::skipped_reads`](crate::CfsFile::skipped_reads).
    #[default]
    Skip,
    /// Finish scanning the file, then fail with
    /// [`CfsError::EmptyReads`](crate::CfsError::EmptyReads) listing every failed read.
    Fail,
}

/// How `set_sweep(.., absolute_time = true)` computes the offset of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOffsetMode {
    /// Sum of the durations (`point_count * x_scale`) of all earlier sweeps.
    #[default]
    Elapsed,
    /// Sum of the final Y sample of every earlier sweep.
    ///
    /// Matches older exports whose sweep offsets were built from signal
    /// values rather than durations.
    LegacySignalSum,
}

/// Options for [`load_with_options`](crate::load_with_options).
///
/// ```
/// use cfs_importer::{EmptyReadPolicy, LoadOptions};
///
/// let options = LoadOptions {
///     on_empty_read: EmptyReadPolicy::Fail,
///     ..LoadOptions::default()
/// };
/// assert!(!options.require_uniform_sweeps);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Default: [`EmptyReadPolicy::Skip`].
    pub on_empty_read: EmptyReadPolicy,

    /// Fail the load when any channel has sweeps of differing lengths.
    ///
    /// When unset, ragged channels still load and are reported by
    /// [`CfsFile::stacked`](crate::CfsFile::stacked).
    ///
    /// Default: `false`.
    pub require_uniform_sweeps: bool,

    /// Default: [`TimeOffsetMode::Elapsed`].
    pub time_offset: TimeOffsetMode,
}

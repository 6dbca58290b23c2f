//! Boundary with the vendor CFS library.
//!
//! [`CfsLibrary`] mirrors the handful of entry points the importer needs.
//! [`DynamicCfsLibrary`] binds them from the vendor's shared library at a
//! caller-supplied path; [`MockLibrary`] serves canned data for tests.
//!
//! All methods take `&mut self`: the vendor library is not re-entrant, so a
//! binding (and every handle it hands out) is used by one caller at a time.

mod dynamic;
pub mod mock;

use log::warn;
use std::path::Path;

use crate::error::Result;
use crate::types::{GeneralInfo, VarScope};

pub use dynamic::DynamicCfsLibrary;
pub use mock::{MockChannel, MockLibrary, MockSweep, MockVar};

/// Opaque handle of one file opened by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub i16);

/// Raw counts as reported by `GetFileInfo`, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawCounts {
    pub channels: i16,
    pub file_vars: i16,
    pub dataset_vars: i16,
    pub datasets: u16,
}

/// Variable descriptor as reported by `GetVarDesc`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VarDesc {
    pub size: i16,
    pub type_code: i16,
    pub units: String,
    pub description: String,
}

/// Channel descriptor as reported by `GetFileChan`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawChannel {
    pub name: String,
    pub y_units: String,
    pub x_units: String,
    pub type_code: i16,
    pub kind: i16,
    pub spacing: i16,
    pub other: i16,
}

/// Channel/dataset record as reported by `GetDSChan`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawCalibration {
    pub start_offset: i64,
    pub points: i64,
    pub y_scale: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub x_offset: f32,
}

/// The foreign contract of the CFS library.
///
/// Dataset numbers are native (1-based). Buffers passed to [`var_value`] and
/// [`chan_data`] are owned by the caller and filled in place.
///
/// [`var_value`]: CfsLibrary::var_value
/// [`chan_data`]: CfsLibrary::chan_data
pub trait CfsLibrary {
    fn open_file(&mut self, path: &Path) -> Result<FileHandle>;

    fn close_file(&mut self, handle: FileHandle) -> Result<()>;

    fn general_info(&mut self, handle: FileHandle) -> Result<GeneralInfo>;

    fn file_info(&mut self, handle: FileHandle) -> Result<RawCounts>;

    fn var_desc(&mut self, handle: FileHandle, var: usize, scope: VarScope) -> Result<VarDesc>;

    /// Copies a variable's value into `buf`, which must be sized from the
    /// descriptor returned by a preceding [`var_desc`](CfsLibrary::var_desc).
    fn var_value(
        &mut self,
        handle: FileHandle,
        var: usize,
        scope: VarScope,
        dataset: usize,
        buf: &mut [u8],
    ) -> Result<()>;

    fn file_chan(&mut self, handle: FileHandle, channel: usize) -> Result<RawChannel>;

    fn ds_chan(&mut self, handle: FileHandle, channel: usize, dataset: usize)
        -> Result<RawCalibration>;

    /// Reads raw samples into `buf`; `count == 0` requests every point.
    ///
    /// Returns the number of points read. Zero or negative means no data.
    fn chan_data(
        &mut self,
        handle: FileHandle,
        channel: usize,
        dataset: usize,
        first: usize,
        count: usize,
        buf: &mut [u8],
    ) -> Result<i64>;
}

/// An open file that is closed exactly once.
///
/// [`close`](ScopedHandle::close) reports the close status. If the guard is
/// dropped instead (an error unwound the load), the file is still closed and
/// a failure is only logged.
pub struct ScopedHandle<'a, L: CfsLibrary + ?Sized> {
    lib: &'a mut L,
    handle: FileHandle,
    closed: bool,
}

impl<'a, L: CfsLibrary + ?Sized> ScopedHandle<'a, L> {
    pub fn open(lib: &'a mut L, path: &Path) -> Result<Self> {
        let handle = lib.open_file(path)?;
        Ok(ScopedHandle {
            lib,
            handle,
            closed: false,
        })
    }

    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    /// The library together with the open handle.
    pub fn parts(&mut self) -> (&mut L, FileHandle) {
        (&mut *self.lib, self.handle)
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.lib.close_file(self.handle)
    }
}

impl<L: CfsLibrary + ?Sized> Drop for ScopedHandle<'_, L> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.lib.close_file(self.handle) {
            warn!("Failed to close CFS handle {}: {}", self.handle.0, e);
        }
    }
}

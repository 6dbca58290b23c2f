use libloading::Library;
use log::debug;
use std::ffi::{c_char, c_void, CString};
use std::path::{Path, PathBuf};

use super::{CfsLibrary, FileHandle, RawCalibration, RawChannel, RawCounts, VarDesc};
use crate::error::{CfsError, Result};
use crate::types::{GeneralInfo, VarScope};

// Function signatures exported by CFS32.dll / CFS64.dll
type FnOpenCfsFile = unsafe extern "system" fn(*const c_char, i16, i16) -> i16;
type FnCloseCfsFile = unsafe extern "system" fn(i16) -> i16;
type FnGetGenInfo = unsafe extern "system" fn(i16, *mut c_char, *mut c_char, *mut c_char);
type FnGetFileInfo = unsafe extern "system" fn(i16, *mut i16, *mut i16, *mut i16, *mut u16);
type FnGetVarDesc =
    unsafe extern "system" fn(i16, i16, i16, *mut i16, *mut i16, *mut c_char, *mut c_char);
type FnGetVarVal = unsafe extern "system" fn(i16, i16, i16, u16, *mut c_void);
type FnGetFileChan = unsafe extern "system" fn(
    i16,
    i16,
    *mut c_char,
    *mut c_char,
    *mut c_char,
    *mut i16,
    *mut i16,
    *mut i16,
    *mut i16,
);
type FnGetDsChan = unsafe extern "system" fn(
    i16,
    i16,
    u16,
    *mut i32,
    *mut i32,
    *mut f32,
    *mut f32,
    *mut f32,
    *mut f32,
);
// Returns a WORD point count; zero means no data was read
type FnGetChanData = unsafe extern "system" fn(i16, i16, u16, i32, u16, *mut c_void, i32) -> u16;
type FnFileError = unsafe extern "system" fn(*mut i16, *mut i16, *mut i16) -> i16;

// String buffer sizes (vendor maxima plus terminator, rounded up)
const TIME_LEN: usize = 10;
const DATE_LEN: usize = 10;
const COMMENT_LEN: usize = 74;
const UNITS_LEN: usize = 20;
const DESCRIPTION_LEN: usize = 50;
const CHANNEL_NAME_LEN: usize = 22;

struct Api {
    open: FnOpenCfsFile,
    close: FnCloseCfsFile,
    gen_info: FnGetGenInfo,
    file_info: FnGetFileInfo,
    var_desc: FnGetVarDesc,
    var_val: FnGetVarVal,
    file_chan: FnGetFileChan,
    ds_chan: FnGetDsChan,
    chan_data: FnGetChanData,
    file_error: FnFileError,
}

/// Binding to the vendor CFS shared library.
///
/// The library path is supplied by the caller; nothing is loaded from the
/// working directory or cached process-wide.
///
/// ```no_run
/// use cfs_importer::native::DynamicCfsLibrary;
///
/// let lib = DynamicCfsLibrary::open("C:/CED/CFS64.dll").unwrap();
/// println!("{}", lib.path().display());
/// ```
pub struct DynamicCfsLibrary {
    api: Api,
    path: PathBuf,
    // Keeps the function pointers in `api` valid
    _lib: Library,
}

impl DynamicCfsLibrary {
    /// Loads the library and resolves every entry point up front.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: loading the vendor library runs its initialisers; the CFS
        // DLL has no load-time side effects beyond its own globals.
        let lib = unsafe { Library::new(&path)? };

        // SAFETY: the signatures above match CFS.h for the exported symbols.
        let api = unsafe {
            Api {
                open: *lib.get::<FnOpenCfsFile>(b"OpenCFSFile\0")?,
                close: *lib.get::<FnCloseCfsFile>(b"CloseCFSFile\0")?,
                gen_info: *lib.get::<FnGetGenInfo>(b"GetGenInfo\0")?,
                file_info: *lib.get::<FnGetFileInfo>(b"GetFileInfo\0")?,
                var_desc: *lib.get::<FnGetVarDesc>(b"GetVarDesc\0")?,
                var_val: *lib.get::<FnGetVarVal>(b"GetVarVal\0")?,
                file_chan: *lib.get::<FnGetFileChan>(b"GetFileChan\0")?,
                ds_chan: *lib.get::<FnGetDsChan>(b"GetDSChan\0")?,
                chan_data: *lib.get::<FnGetChanData>(b"GetChanData\0")?,
                file_error: *lib.get::<FnFileError>(b"FileError\0")?,
            }
        };

        debug!("Loaded CFS library from {}", path.display());
        Ok(DynamicCfsLibrary {
            api,
            path,
            _lib: lib,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turns a pending library error into `CfsError::NativeCall`.
    ///
    /// The void entry points only report failures through `FileError`,
    /// which also clears the pending error.
    fn check(&mut self, call: &'static str, args: String) -> Result<()> {
        let mut handle = 0i16;
        let mut proc_no = 0i16;
        let mut err_no = 0i16;
        // SAFETY: all three out-pointers reference live locals.
        let pending = unsafe { (self.api.file_error)(&mut handle, &mut proc_no, &mut err_no) };
        if pending != 0 {
            return Err(CfsError::NativeCall {
                call,
                args,
                code: err_no as i32,
            });
        }
        Ok(())
    }
}

fn native_index(what: &'static str, value: usize) -> Result<i16> {
    i16::try_from(value).map_err(|_| CfsError::InvalidCount {
        what,
        value: value as i64,
    })
}

fn native_dataset(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| CfsError::InvalidCount {
        what: "dataset number",
        value: value as i64,
    })
}

/// Decodes a NUL-terminated native string buffer.
fn c_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl CfsLibrary for DynamicCfsLibrary {
    fn open_file(&mut self, path: &Path) -> Result<FileHandle> {
        if !path.is_file() {
            return Err(CfsError::FileNotFound(path.to_path_buf()));
        }
        let name = CString::new(path.to_string_lossy().as_bytes()).map_err(|_| {
            CfsError::OpenFailed {
                path: path.to_path_buf(),
                code: 0,
            }
        })?;
        // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
        let code = unsafe { (self.api.open)(name.as_ptr(), 0, 0) };
        if code < 0 {
            return Err(CfsError::OpenFailed {
                path: path.to_path_buf(),
                code: code as i32,
            });
        }
        Ok(FileHandle(code))
    }

    fn close_file(&mut self, handle: FileHandle) -> Result<()> {
        // SAFETY: plain value arguments.
        let code = unsafe { (self.api.close)(handle.0) };
        if code < 0 {
            return Err(CfsError::NativeCall {
                call: "CloseCFSFile",
                args: format!("handle={}", handle.0),
                code: code as i32,
            });
        }
        Ok(())
    }

    fn general_info(&mut self, handle: FileHandle) -> Result<GeneralInfo> {
        let mut time = [0u8; TIME_LEN];
        let mut date = [0u8; DATE_LEN];
        let mut comment = [0u8; COMMENT_LEN];
        // SAFETY: buffers exceed the vendor's maximum string lengths.
        unsafe {
            (self.api.gen_info)(
                handle.0,
                time.as_mut_ptr().cast(),
                date.as_mut_ptr().cast(),
                comment.as_mut_ptr().cast(),
            )
        };
        self.check("GetGenInfo", format!("handle={}", handle.0))?;
        Ok(GeneralInfo {
            time: c_string(&time),
            date: c_string(&date),
            comment: c_string(&comment),
        })
    }

    fn file_info(&mut self, handle: FileHandle) -> Result<RawCounts> {
        let mut counts = RawCounts::default();
        // SAFETY: out-pointers reference fields of a live local.
        unsafe {
            (self.api.file_info)(
                handle.0,
                &mut counts.channels,
                &mut counts.file_vars,
                &mut counts.dataset_vars,
                &mut counts.datasets,
            )
        };
        self.check("GetFileInfo", format!("handle={}", handle.0))?;
        Ok(counts)
    }

    fn var_desc(&mut self, handle: FileHandle, var: usize, scope: VarScope) -> Result<VarDesc> {
        let var_no = native_index("variable number", var)?;
        let mut size = 0i16;
        // Some library builds write a single byte here; a zeroed i16
        // receives either width on little-endian targets.
        let mut type_code = 0i16;
        let mut units = [0u8; UNITS_LEN];
        let mut description = [0u8; DESCRIPTION_LEN];
        // SAFETY: out-pointers reference live locals of sufficient size.
        unsafe {
            (self.api.var_desc)(
                handle.0,
                var_no,
                scope.flag(),
                &mut size,
                &mut type_code,
                units.as_mut_ptr().cast(),
                description.as_mut_ptr().cast(),
            )
        };
        self.check(
            "GetVarDesc",
            format!("handle={}, var={}, kind={}", handle.0, var, scope.flag()),
        )?;
        Ok(VarDesc {
            size,
            type_code,
            units: c_string(&units),
            description: c_string(&description),
        })
    }

    fn var_value(
        &mut self,
        handle: FileHandle,
        var: usize,
        scope: VarScope,
        dataset: usize,
        buf: &mut [u8],
    ) -> Result<()> {
        let var_no = native_index("variable number", var)?;
        let section = native_dataset(dataset)?;
        // SAFETY: the caller sized `buf` from the preceding GetVarDesc.
        unsafe {
            (self.api.var_val)(
                handle.0,
                var_no,
                scope.flag(),
                section,
                buf.as_mut_ptr().cast(),
            )
        };
        self.check(
            "GetVarVal",
            format!(
                "handle={}, var={}, kind={}, dataset={}",
                handle.0,
                var,
                scope.flag(),
                dataset
            ),
        )
    }

    fn file_chan(&mut self, handle: FileHandle, channel: usize) -> Result<RawChannel> {
        let chan = native_index("channel number", channel)?;
        let mut name = [0u8; CHANNEL_NAME_LEN];
        let mut y_units = [0u8; UNITS_LEN];
        let mut x_units = [0u8; UNITS_LEN];
        let mut raw = RawChannel::default();
        // SAFETY: out-pointers reference live locals of sufficient size.
        unsafe {
            (self.api.file_chan)(
                handle.0,
                chan,
                name.as_mut_ptr().cast(),
                y_units.as_mut_ptr().cast(),
                x_units.as_mut_ptr().cast(),
                &mut raw.type_code,
                &mut raw.kind,
                &mut raw.spacing,
                &mut raw.other,
            )
        };
        self.check(
            "GetFileChan",
            format!("handle={}, channel={}", handle.0, channel),
        )?;
        raw.name = c_string(&name);
        raw.y_units = c_string(&y_units);
        raw.x_units = c_string(&x_units);
        Ok(raw)
    }

    fn ds_chan(
        &mut self,
        handle: FileHandle,
        channel: usize,
        dataset: usize,
    ) -> Result<RawCalibration> {
        let chan = native_index("channel number", channel)?;
        let section = native_dataset(dataset)?;
        let mut offset = 0i32;
        let mut points = 0i32;
        let mut cal = RawCalibration::default();
        // SAFETY: out-pointers reference live locals.
        unsafe {
            (self.api.ds_chan)(
                handle.0,
                chan,
                section,
                &mut offset,
                &mut points,
                &mut cal.y_scale,
                &mut cal.y_offset,
                &mut cal.x_scale,
                &mut cal.x_offset,
            )
        };
        self.check(
            "GetDSChan",
            format!(
                "handle={}, channel={}, dataset={}",
                handle.0, channel, dataset
            ),
        )?;
        cal.start_offset = offset as i64;
        cal.points = points as i64;
        Ok(cal)
    }

    fn chan_data(
        &mut self,
        handle: FileHandle,
        channel: usize,
        dataset: usize,
        first: usize,
        count: usize,
        buf: &mut [u8],
    ) -> Result<i64> {
        let chan = native_index("channel number", channel)?;
        let section = native_dataset(dataset)?;
        let first = i32::try_from(first).map_err(|_| CfsError::InvalidCount {
            what: "first element",
            value: first as i64,
        })?;
        // Requests beyond the WORD range fall back to "all points"
        let count = u16::try_from(count).unwrap_or(0);
        let area = i32::try_from(buf.len()).map_err(|_| CfsError::InvalidCount {
            what: "buffer size",
            value: buf.len() as i64,
        })?;
        // SAFETY: `area` tells the library how many bytes `buf` can take.
        let read = unsafe {
            (self.api.chan_data)(
                handle.0,
                chan,
                section,
                first,
                count,
                buf.as_mut_ptr().cast(),
                area,
            )
        };
        self.check(
            "GetChanData",
            format!(
                "handle={}, channel={}, dataset={}, first={}, count={}, bytes={}",
                handle.0, channel, dataset, first, count, area
            ),
        )?;
        Ok(i64::from(read))
    }
}

//! In-memory stand-in for the vendor library.
//!
//! [`MockLibrary`] answers every [`CfsLibrary`] call from canned descriptors
//! and raw sample values, encodes sample buffers exactly as the native
//! library lays them out (Y half, then a zero-filled X half), and keeps a
//! journal of calls so tests can check ordering and handle release.

use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use super::{CfsLibrary, FileHandle, RawCalibration, RawChannel, RawCounts, VarDesc};
use crate::error::{CfsError, Result};
use crate::types::{GeneralInfo, VarScope, VarType, VarValue};

/// A canned file or dataset variable.
#[derive(Debug, Clone, PartialEq)]
pub struct MockVar {
    pub description: String,
    pub units: String,
    pub var_type: VarType,
    pub size: i16,
    pub value: VarValue,
}

impl MockVar {
    pub fn new(description: &str, units: &str, var_type: VarType, value: VarValue) -> Self {
        let size = match &value {
            VarValue::Text(s) => s.len() as i16,
            _ => var_type.width() as i16,
        };
        MockVar {
            description: description.to_string(),
            units: units.to_string(),
            var_type,
            size,
            value,
        }
    }
}

/// Raw samples and calibration of one channel in one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSweep {
    /// Raw values, converted to the channel's storage type when read
    pub raw: Vec<f64>,
    pub start_offset: i64,
    pub y_scale: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub x_offset: f32,
    /// Overrides the returned point count (e.g. `Some(0)` for no data)
    pub points_read: Option<i64>,
    /// Overrides the point count reported by `ds_chan`
    pub points: Option<i64>,
}

impl MockSweep {
    pub fn new(raw: Vec<f64>, x_scale: f32, x_offset: f32) -> Self {
        MockSweep {
            raw,
            start_offset: 0,
            y_scale: 1.0,
            y_offset: 0.0,
            x_scale,
            x_offset,
            points_read: None,
            points: None,
        }
    }

    pub fn scaled(mut self, y_scale: f32, y_offset: f32) -> Self {
        self.y_scale = y_scale;
        self.y_offset = y_offset;
        self
    }

    /// The read of this sweep reports no points.
    pub fn unreadable(mut self) -> Self {
        self.points_read = Some(0);
        self
    }
}

/// A canned channel and its per-dataset sweeps.
#[derive(Debug, Clone, PartialEq)]
pub struct MockChannel {
    pub name: String,
    pub y_units: String,
    pub x_units: String,
    pub var_type: VarType,
    pub kind: i16,
    pub sweeps: Vec<MockSweep>,
}

impl MockChannel {
    pub fn new(name: &str, y_units: &str, var_type: VarType) -> Self {
        MockChannel {
            name: name.to_string(),
            y_units: y_units.to_string(),
            x_units: "s".to_string(),
            var_type,
            kind: 0,
            sweeps: Vec::new(),
        }
    }

    pub fn with_sweep(mut self, sweep: MockSweep) -> Self {
        self.sweeps.push(sweep);
        self
    }
}

/// Test double for [`CfsLibrary`].
///
/// ```
/// use cfs_importer::native::{MockChannel, MockLibrary, MockSweep};
/// use cfs_importer::{load, VarType};
///
/// let mut lib = MockLibrary::new(1).with_channel(
///     MockChannel::new("Vm", "mV", VarType::Int16)
///         .with_sweep(MockSweep::new(vec![1.0, 2.0, 3.0], 0.001, 0.0)),
/// );
/// let cfs = load(MockLibrary::PATH, &mut lib).unwrap();
/// assert_eq!(cfs.channels[0].sweeps[0].y.to_vec(), vec![1.0, 2.0, 3.0]);
/// assert_eq!(lib.close_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockLibrary {
    pub info: GeneralInfo,
    pub datasets: u16,
    pub file_vars: Vec<MockVar>,
    /// Indexed `[dataset - 1][variable]`
    pub dataset_vars: Vec<Vec<MockVar>>,
    pub channels: Vec<MockChannel>,
    /// Name of a native call that should fail
    pub fail_on: Option<&'static str>,
    /// Every call made, in order, with its arguments
    pub journal: Vec<String>,
    open: HashSet<i16>,
    next_handle: i16,
    opens: usize,
    closes: usize,
    last_desc: Option<(usize, VarScope, VarDesc)>,
}

impl MockLibrary {
    /// Path accepted by [`open_file`](CfsLibrary::open_file) without touching the disk.
    pub const PATH: &'static str = "mock.cfs";

    pub fn new(datasets: u16) -> Self {
        MockLibrary {
            info: GeneralInfo {
                time: "10:30:00".to_string(),
                date: "15/06/22".to_string(),
                comment: String::new(),
            },
            datasets,
            ..MockLibrary::default()
        }
    }

    pub fn with_info(mut self, date: &str, time: &str, comment: &str) -> Self {
        self.info = GeneralInfo {
            time: time.to_string(),
            date: date.to_string(),
            comment: comment.to_string(),
        };
        self
    }

    pub fn with_file_var(mut self, var: MockVar) -> Self {
        self.file_vars.push(var);
        self
    }

    /// Sets the dataset variables; every dataset needs the same list length.
    pub fn with_dataset_vars(mut self, vars: Vec<Vec<MockVar>>) -> Self {
        self.dataset_vars = vars;
        self
    }

    pub fn with_channel(mut self, channel: MockChannel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens
    }

    pub fn close_count(&self) -> usize {
        self.closes
    }

    /// Whether any handle is still open.
    pub fn has_open_handles(&self) -> bool {
        !self.open.is_empty()
    }

    fn enter(&mut self, call: &'static str, args: String) -> Result<()> {
        self.journal.push(format!("{}({})", call, args));
        if self.fail_on == Some(call) {
            return Err(CfsError::NativeCall {
                call,
                args,
                code: -1,
            });
        }
        Ok(())
    }

    fn require_open(&self, call: &'static str, handle: FileHandle) -> Result<()> {
        if !self.open.contains(&handle.0) {
            return Err(CfsError::NativeCall {
                call,
                args: format!("handle={}", handle.0),
                code: -2,
            });
        }
        Ok(())
    }

    fn sweep(&self, call: &'static str, channel: usize, dataset: usize) -> Result<&MockSweep> {
        dataset
            .checked_sub(1)
            .and_then(|d| self.channels.get(channel)?.sweeps.get(d))
            .ok_or_else(|| CfsError::NativeCall {
                call,
                args: format!("channel={}, dataset={}", channel, dataset),
                code: -3,
            })
    }

    fn var(&self, var: usize, scope: VarScope, dataset: usize) -> Option<&MockVar> {
        match scope {
            VarScope::File => self.file_vars.get(var),
            VarScope::Dataset => self
                .dataset_vars
                .get(dataset.checked_sub(1)?)
                .and_then(|vars| vars.get(var))
                // descriptors are shared by all datasets
                .or_else(|| self.dataset_vars.first()?.get(var)),
        }
    }
}

fn write_value(cursor: &mut Cursor<&mut [u8]>, var_type: VarType, value: f64) -> std::io::Result<()> {
    match var_type {
        VarType::Int16 | VarType::Int16Alt => cursor.write_i16::<LittleEndian>(value as i16),
        VarType::UInt16 | VarType::UInt16Alt => cursor.write_u16::<LittleEndian>(value as u16),
        VarType::Int32 => cursor.write_i32::<LittleEndian>(value as i32),
        VarType::Float32 => cursor.write_f32::<LittleEndian>(value as f32),
        VarType::Float64 => cursor.write_f64::<LittleEndian>(value),
        VarType::FixedString => cursor.write_u8(value as u8),
    }
}

fn short_buffer(call: &'static str, needed: usize, got: usize) -> CfsError {
    CfsError::NativeCall {
        call,
        args: format!("buffer of {} bytes, {} needed", got, needed),
        code: -4,
    }
}

impl CfsLibrary for MockLibrary {
    fn open_file(&mut self, path: &Path) -> Result<FileHandle> {
        self.enter("OpenCFSFile", path.display().to_string())?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.open.insert(handle);
        self.opens += 1;
        Ok(FileHandle(handle))
    }

    fn close_file(&mut self, handle: FileHandle) -> Result<()> {
        self.journal.push(format!("CloseCFSFile(handle={})", handle.0));
        if !self.open.remove(&handle.0) {
            return Err(CfsError::NativeCall {
                call: "CloseCFSFile",
                args: format!("handle={}", handle.0),
                code: -2,
            });
        }
        self.closes += 1;
        Ok(())
    }

    fn general_info(&mut self, handle: FileHandle) -> Result<GeneralInfo> {
        self.enter("GetGenInfo", format!("handle={}", handle.0))?;
        self.require_open("GetGenInfo", handle)?;
        Ok(self.info.clone())
    }

    fn file_info(&mut self, handle: FileHandle) -> Result<RawCounts> {
        self.enter("GetFileInfo", format!("handle={}", handle.0))?;
        self.require_open("GetFileInfo", handle)?;
        Ok(RawCounts {
            channels: self.channels.len() as i16,
            file_vars: self.file_vars.len() as i16,
            dataset_vars: self.dataset_vars.first().map_or(0, Vec::len) as i16,
            datasets: self.datasets,
        })
    }

    fn var_desc(&mut self, handle: FileHandle, var: usize, scope: VarScope) -> Result<VarDesc> {
        self.enter("GetVarDesc", format!("var={}, kind={}", var, scope.flag()))?;
        self.require_open("GetVarDesc", handle)?;
        let desc = self
            .var(var, scope, 1)
            .map(|v| VarDesc {
                size: v.size,
                type_code: v.var_type.code(),
                units: v.units.clone(),
                description: v.description.clone(),
            })
            .ok_or_else(|| CfsError::NativeCall {
                call: "GetVarDesc",
                args: format!("var={}, kind={}", var, scope.flag()),
                code: -3,
            })?;
        self.last_desc = Some((var, scope, desc.clone()));
        Ok(desc)
    }

    fn var_value(
        &mut self,
        handle: FileHandle,
        var: usize,
        scope: VarScope,
        dataset: usize,
        buf: &mut [u8],
    ) -> Result<()> {
        let args = format!("var={}, kind={}, dataset={}", var, scope.flag(), dataset);
        self.enter("GetVarVal", args.clone())?;
        self.require_open("GetVarVal", handle)?;

        // The value can only be sized from the descriptor of the same variable
        match &self.last_desc {
            Some((v, s, _)) if *v == var && *s == scope => {}
            _ => {
                return Err(CfsError::NativeCall {
                    call: "GetVarVal",
                    args,
                    code: -5,
                })
            }
        }

        let value = self
            .var(var, scope, dataset)
            .map(|v| (v.var_type, v.value.clone()))
            .ok_or(CfsError::NativeCall {
                call: "GetVarVal",
                args: args.clone(),
                code: -3,
            })?;

        match value {
            (_, VarValue::Text(text)) => {
                let needed = text.len() + 1;
                if buf.len() < needed {
                    return Err(short_buffer("GetVarVal", needed, buf.len()));
                }
                buf[..text.len()].copy_from_slice(text.as_bytes());
                buf[text.len()] = 0;
            }
            (var_type, numeric) => {
                if buf.len() < var_type.width() {
                    return Err(short_buffer("GetVarVal", var_type.width(), buf.len()));
                }
                let number = numeric.as_f64().unwrap_or_default();
                let mut cursor = Cursor::new(buf);
                write_value(&mut cursor, var_type, number)?;
            }
        }
        Ok(())
    }

    fn file_chan(&mut self, handle: FileHandle, channel: usize) -> Result<RawChannel> {
        self.enter("GetFileChan", format!("channel={}", channel))?;
        self.require_open("GetFileChan", handle)?;
        let ch = self.channels.get(channel).ok_or(CfsError::NativeCall {
            call: "GetFileChan",
            args: format!("channel={}", channel),
            code: -3,
        })?;
        Ok(RawChannel {
            name: ch.name.clone(),
            y_units: ch.y_units.clone(),
            x_units: ch.x_units.clone(),
            type_code: ch.var_type.code(),
            kind: ch.kind,
            spacing: ch.var_type.width() as i16,
            other: 0,
        })
    }

    fn ds_chan(
        &mut self,
        handle: FileHandle,
        channel: usize,
        dataset: usize,
    ) -> Result<RawCalibration> {
        self.enter("GetDSChan", format!("channel={}, dataset={}", channel, dataset))?;
        self.require_open("GetDSChan", handle)?;
        let sweep = self.sweep("GetDSChan", channel, dataset)?;
        Ok(RawCalibration {
            start_offset: sweep.start_offset,
            points: sweep.points.unwrap_or(sweep.raw.len() as i64),
            y_scale: sweep.y_scale,
            y_offset: sweep.y_offset,
            x_scale: sweep.x_scale,
            x_offset: sweep.x_offset,
        })
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
        self.enter(
            "GetChanData",
            format!(
                "channel={}, dataset={}, first={}, count={}, bytes={}",
                channel,
                dataset,
                first,
                count,
                buf.len()
            ),
        )?;
        self.require_open("GetChanData", handle)?;
        let var_type = self
            .channels
            .get(channel)
            .map(|c| c.var_type)
            .unwrap_or(VarType::Int16);
        let sweep = self.sweep("GetChanData", channel, dataset)?;
        if let Some(points) = sweep.points_read {
            return Ok(points);
        }

        let end = if count == 0 {
            sweep.raw.len()
        } else {
            (first + count).min(sweep.raw.len())
        };
        let values = sweep.raw.get(first..end).unwrap_or(&[]);
        let needed = values.len() * var_type.width();
        if buf.len() < needed {
            return Err(short_buffer("GetChanData", needed, buf.len()));
        }

        buf.fill(0);
        let mut cursor = Cursor::new(buf);
        for &value in values {
            write_value(&mut cursor, var_type, value)?;
        }
        Ok(values.len() as i64)
    }
}

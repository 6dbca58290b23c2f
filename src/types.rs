use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use std::fmt;
use std::path::PathBuf;

use crate::config::LoadOptions;
use crate::error::{CfsError, FailedRead, Result};
use crate::sweep::SweepCursor;

/// Storage type of a CFS variable or channel.
///
/// The numeric codes are the ones used by the native library. The type fixes
/// both the decode path and the width of one slot in a native buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    /// Code 0 (`INT1`)
    Int16,
    /// Code 1 (`WRD1`)
    UInt16,
    /// Code 2 (`INT2`)
    Int16Alt,
    /// Code 3 (`WRD2`)
    UInt16Alt,
    /// Code 4 (`INT4`), stored in physical units and never rescaled
    Int32,
    /// Code 5 (`RL4`)
    Float32,
    /// Code 6 (`RL8`)
    Float64,
    /// Code 7 (`LSTR`), a NUL-terminated string of the descriptor's `size`
    FixedString,
}

impl VarType {
    /// Maps a native type code to a `VarType`.
    pub fn from_code(code: i16) -> Result<Self> {
        Ok(match code {
            0 => VarType::Int16,
            1 => VarType::UInt16,
            2 => VarType::Int16Alt,
            3 => VarType::UInt16Alt,
            4 => VarType::Int32,
            5 => VarType::Float32,
            6 => VarType::Float64,
            7 => VarType::FixedString,
            other => return Err(CfsError::UnknownVarType(other)),
        })
    }

    pub fn code(self) -> i16 {
        match self {
            VarType::Int16 => 0,
            VarType::UInt16 => 1,
            VarType::Int16Alt => 2,
            VarType::UInt16Alt => 3,
            VarType::Int32 => 4,
            VarType::Float32 => 5,
            VarType::Float64 => 6,
            VarType::FixedString => 7,
        }
    }

    /// Width in bytes of one slot of this type in a native buffer.
    pub fn width(self) -> usize {
        match self {
            VarType::Int16 | VarType::UInt16 | VarType::Int16Alt | VarType::UInt16Alt => 2,
            VarType::Int32 | VarType::Float32 => 4,
            VarType::Float64 => 8,
            VarType::FixedString => 1,
        }
    }

    /// The wide integer type holds samples that are already in physical units.
    pub fn is_wide_integer(self) -> bool {
        self == VarType::Int32
    }

    /// Name used by CED documentation for this type.
    pub fn cfs_name(self) -> &'static str {
        match self {
            VarType::Int16 => "INT1",
            VarType::UInt16 => "WRD1",
            VarType::Int16Alt => "INT2",
            VarType::UInt16Alt => "WRD2",
            VarType::Int32 => "INT4",
            VarType::Float32 => "RL4",
            VarType::Float64 => "RL8",
            VarType::FixedString => "LSTR",
        }
    }
}

/// Whether a variable belongs to the whole file or to a single dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    File,
    Dataset,
}

impl VarScope {
    /// Native `varKind` flag.
    pub fn flag(self) -> i16 {
        match self {
            VarScope::File => 0,
            VarScope::Dataset => 1,
        }
    }
}

/// Decoded value of a file or dataset variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl VarValue {
    /// Numeric view of the value; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VarValue::Int(v) => Some(*v as f64),
            VarValue::Float(v) => Some(*v),
            VarValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VarValue::Int(v) => write!(f, "{}", v),
            VarValue::Float(v) => write!(f, "{}", v),
            VarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A file-scope or dataset-scope variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    /// Free-text description (e.g. "Sample interval")
    pub description: String,
    /// Declared size in bytes; for strings, the maximum string length
    pub size: i16,
    /// Units string as stored in the file
    pub units: String,
    pub var_type: VarType,
    pub value: VarValue,
}

/// Static description of a channel. One per channel for the whole file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    /// 0-based channel number
    pub index: usize,
    pub name: String,
    /// Units of the time axis, usually "s"
    pub x_units: String,
    /// Units of the signal
    pub y_units: String,
    /// On-disk sample type
    pub var_type: VarType,
    /// Native data kind (0 = equal spacing, 1 = matrix, 2 = subsidiary)
    pub kind: i16,
    /// Byte spacing between successive samples of this channel
    pub spacing: i16,
    /// Index of the parent/child channel for matrix data
    pub other: i16,
}

impl ChannelDescriptor {
    pub fn is_equal_spaced(&self) -> bool {
        self.kind == 0
    }
}

/// Per-(channel, dataset) calibration and size record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetChannelCalibration {
    pub channel: usize,
    /// Native dataset number, starting at 1
    pub dataset: usize,
    /// Byte offset of the channel's first sample within the dataset
    pub start_offset: i64,
    /// Number of samples stored for this channel in this dataset
    pub point_count: usize,
    pub y_scale: f32,
    pub y_offset: f32,
    /// Sample interval (seconds)
    pub x_scale: f32,
    /// Time of the first sample (seconds)
    pub x_offset: f32,
}

/// Structural counts reported for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileCounts {
    pub channels: usize,
    pub file_vars: usize,
    pub dataset_vars: usize,
    /// Number of datasets (sweeps)
    pub datasets: usize,
}

/// General file information strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneralInfo {
    /// Recording time, "HH:MM:SS"
    pub time: String,
    /// Recording date, "DD/MM/YY"
    pub date: String,
    pub comment: String,
}

impl GeneralInfo {
    /// Parses the recording date and time.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let stamp = format!("{} {}", self.date.trim(), self.time.trim());
        NaiveDateTime::parse_from_str(&stamp, "%d/%m/%y %H:%M:%S").ok()
    }
}

/// One decoded sweep of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// 0-based sweep number
    pub index: usize,
    /// Time of each sample (seconds)
    pub x: Array1<f64>,
    /// Calibrated signal
    pub y: Array1<f64>,
    pub calibration: DatasetChannelCalibration,
}

impl Sweep {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Time covered by the sweep: one sample interval per point.
    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.calibration.x_scale as f64
    }
}

/// All decoded sweeps of one channel, in ascending sweep order.
///
/// Sweeps whose read returned no data are absent, so `sweeps[i].index`
/// need not equal `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSweeps {
    pub descriptor: ChannelDescriptor,
    pub sweeps: Vec<Sweep>,
}

impl ChannelSweeps {
    /// Looks up a sweep by its sweep number.
    pub fn get(&self, sweep: usize) -> Option<&Sweep> {
        self.sweeps
            .binary_search_by_key(&sweep, |s| s.index)
            .ok()
            .map(|i| &self.sweeps[i])
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.sweeps.iter().map(Sweep::len).collect()
    }

    pub fn is_uniform(&self) -> bool {
        self.sweeps.windows(2).all(|w| w[0].len() == w[1].len())
    }

    /// Stacks the sweeps into `[sweep, sample]` X and Y arrays.
    ///
    /// A channel without sweeps yields two `(0, 0)` arrays. Sweeps of
    /// differing lengths are reported as [`CfsError::RaggedChannel`].
    pub fn stacked(&self) -> Result<(Array2<f64>, Array2<f64>)> {
        if !self.is_uniform() {
            return Err(CfsError::RaggedChannel {
                channel: self.descriptor.index,
                lengths: self.lengths(),
            });
        }

        let num_points = self.sweeps.first().map_or(0, Sweep::len);
        let mut x = Array2::<f64>::zeros((self.sweeps.len(), num_points));
        let mut y = Array2::<f64>::zeros((self.sweeps.len(), num_points));

        for (row, sweep) in self.sweeps.iter().enumerate() {
            x.row_mut(row).assign(&sweep.x);
            y.row_mut(row).assign(&sweep.y);
        }

        Ok((x, y))
    }
}

/// Complete in-memory representation of a CFS recording.
///
/// This is the struct returned by [`load`](crate::load). All sweeps of all
/// channels are decoded at load time; the native file is closed before the
/// value is returned.
///
/// # Examples
///
/// ```no_run
/// use cfs_importer::{load, native::DynamicCfsLibrary};
///
/// let mut lib = DynamicCfsLibrary::open("lib/CFS64.dll").unwrap();
/// let mut cfs = load("data/cell1.cfs", &mut lib).unwrap();
///
/// println!("{} sweeps at {} Hz", cfs.sweep_count, cfs.data_rate().unwrap_or(0.0));
/// let cursor = cfs.set_sweep(0, 0, false).unwrap();
/// println!("first sample: {} {}", cursor.sweep_y[0], cursor.sweep_units_y);
/// ```
#[derive(Debug, Clone)]
pub struct CfsFile {
    /// Absolute path of the recording
    pub path: PathBuf,
    /// File stem, used as the recording ID
    pub id: String,
    pub info: GeneralInfo,
    pub counts: FileCounts,
    pub file_vars: Vec<VariableDescriptor>,
    /// Dataset variables, indexed `[sweep][variable]`
    pub dataset_vars: Vec<Vec<VariableDescriptor>>,
    /// Decoded sweeps, indexed by channel
    pub channels: Vec<ChannelSweeps>,
    pub sweep_count: usize,
    pub channel_count: usize,
    /// Reads that returned no data and were skipped
    pub skipped_reads: Vec<FailedRead>,
    pub(crate) options: LoadOptions,
    pub(crate) cursor: Option<SweepCursor>,
}

impl CfsFile {
    /// Recording start parsed from the file's date and time strings.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        self.info.datetime()
    }

    /// Sample rate (Hz) derived from the first two samples of channel 0, sweep 0.
    pub fn data_rate(&self) -> Option<f64> {
        let sweep = self.channels.first()?.sweeps.first()?;
        if sweep.x.len() < 2 {
            return None;
        }
        let step = sweep.x[1] - sweep.x[0];
        (step > 0.0).then(|| 1.0 / step)
    }

    pub fn sweep_list(&self) -> Vec<usize> {
        (0..self.sweep_count).collect()
    }

    pub fn channel_list(&self) -> Vec<usize> {
        (0..self.channel_count).collect()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels
            .iter()
            .map(|c| c.descriptor.name.as_str())
            .collect()
    }

    /// Stacked `[sweep, sample]` arrays for one channel.
    pub fn stacked(&self, channel: usize) -> Result<(Array2<f64>, Array2<f64>)> {
        self.channel(channel)?.stacked()
    }

    pub fn channel(&self, channel: usize) -> Result<&ChannelSweeps> {
        self.channels
            .get(channel)
            .ok_or(CfsError::ChannelOutOfRange {
                index: channel,
                count: self.channel_count,
            })
    }

    /// Total number of decoded samples across all channels and sweeps.
    pub fn num_samples(&self) -> usize {
        self.channels
            .iter()
            .flat_map(|c| c.sweeps.iter())
            .map(Sweep::len)
            .sum()
    }
}

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, warn};
use ndarray::Array1;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{EmptyReadPolicy, LoadOptions};
use crate::error::{CfsError, FailedRead, Result};
use crate::native::{CfsLibrary, FileHandle, ScopedHandle};
use crate::types::*;

// Dataset number passed with file-scope variables
const FILE_SCOPE_DATASET: usize = 0;
// Large enough for the widest scalar type
const SCALAR_BUFFER_LEN: usize = 8;
const CFS_EXTENSION: &str = "cfs";

/// Everything the descriptor tables of an open file report.
#[derive(Debug, Clone)]
pub(crate) struct Descriptors {
    pub info: GeneralInfo,
    pub counts: FileCounts,
    pub file_vars: Vec<VariableDescriptor>,
    /// Indexed `[sweep][variable]`
    pub dataset_vars: Vec<Vec<VariableDescriptor>>,
    pub channels: Vec<ChannelDescriptor>,
    /// Indexed `[channel][sweep]`
    pub calibrations: Vec<Vec<DatasetChannelCalibration>>,
}

/// Loads a CFS file and decodes every sweep of every channel.
///
/// The file is opened through `lib`, all descriptor tables and sample
/// buffers are read, and the native handle is released before returning,
/// also when decoding fails part-way.
///
/// # Arguments
///
/// * `file_path` - Path to the CFS file to load
/// * `lib` - Binding to the native CFS library
/// * `options` - Read-failure and sweep-length policies
pub fn load_file<L, P>(file_path: P, lib: &mut L, options: &LoadOptions) -> Result<CfsFile>
where
    L: CfsLibrary + ?Sized,
    P: AsRef<Path>,
{
    let tic = Instant::now();

    let path = absolute_path(file_path.as_ref())?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("Opening CFS file {}", path.display());

    let mut file = ScopedHandle::open(lib, &path)?;
    let (lib, handle) = file.parts();

    let descriptors = read_descriptors(lib, handle)?;
    let (channels, failed_reads) = read_all_sweeps(lib, handle, &descriptors)?;

    // Decoding is eager; the handle is not needed past this point
    file.close()?;

    apply_read_policy(options, &failed_reads)?;
    if options.require_uniform_sweeps {
        check_uniform_sweeps(&channels)?;
    }

    let cfs = CfsFile {
        path,
        id,
        info: descriptors.info,
        counts: descriptors.counts,
        file_vars: descriptors.file_vars,
        dataset_vars: descriptors.dataset_vars,
        sweep_count: descriptors.counts.datasets,
        channel_count: descriptors.counts.channels,
        channels,
        skipped_reads: failed_reads,
        options: options.clone(),
        cursor: None,
    };

    log_file_summary(&cfs);
    info!(
        "Done! Elapsed time: {:.1} seconds",
        tic.elapsed().as_secs_f64()
    );

    Ok(cfs)
}

/// Loads every `.cfs` file of a folder, ordered by path.
///
/// A path to a single file loads just that file.
pub fn load_folder<L, P>(folder: P, lib: &mut L, options: &LoadOptions) -> Result<Vec<CfsFile>>
where
    L: CfsLibrary + ?Sized,
    P: AsRef<Path>,
{
    let folder = folder.as_ref();
    if folder.is_file() {
        return Ok(vec![load_file(folder, lib, options)?]);
    }
    if !folder.is_dir() {
        return Err(CfsError::FileNotFound(folder.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && has_cfs_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        info!("Loading file {}/{}: {}", i + 1, paths.len(), path.display());
        files.push(load_file(path, lib, options)?);
    }

    info!("Loaded {} CFS files from {}", files.len(), folder.display());
    Ok(files)
}

/// Returns the recording with the oldest start time.
///
/// Files whose date/time cannot be parsed are only chosen when no file has
/// a valid time stamp.
pub fn reference_file(files: &[CfsFile]) -> Option<&CfsFile> {
    files
        .iter()
        .filter(|f| f.datetime().is_some())
        .min_by_key(|f| f.datetime())
        .or_else(|| files.first())
}

/// Verifies that two recordings share a channel layout and sample rate.
pub fn verify_compatibility(first: &CfsFile, other: &CfsFile) -> Result<()> {
    if first.channel_count != other.channel_count {
        return Err(CfsError::Inconsistent(format!(
            "number of channels doesn't match: {} vs {}",
            first.channel_count, other.channel_count
        )));
    }

    for (i, (a, b)) in first.channel_names().iter().zip(other.channel_names()).enumerate() {
        if *a != b {
            return Err(CfsError::Inconsistent(format!(
                "channel {} names don't match: '{}' vs '{}'",
                i, a, b
            )));
        }
    }

    if let (Some(a), Some(b)) = (first.data_rate(), other.data_rate()) {
        if (a - b).abs() > 0.01 {
            return Err(CfsError::Inconsistent(format!(
                "sample rates don't match: {} Hz vs {} Hz",
                a, b
            )));
        }
    }

    Ok(())
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn has_cfs_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(CFS_EXTENSION))
        .unwrap_or(false)
}

/// Reads every descriptor table of an open file.
pub(crate) fn read_descriptors<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
) -> Result<Descriptors> {
    let info = lib.general_info(handle)?;
    let counts = read_counts(lib, handle)?;

    let file_vars = (0..counts.file_vars)
        .map(|var| read_variable(lib, handle, var, VarScope::File, FILE_SCOPE_DATASET))
        .collect::<Result<Vec<_>>>()?;

    // Dataset numbers start at 1
    let mut dataset_vars = Vec::with_capacity(counts.datasets);
    for dataset in 1..=counts.datasets {
        let vars = (0..counts.dataset_vars)
            .map(|var| read_variable(lib, handle, var, VarScope::Dataset, dataset))
            .collect::<Result<Vec<_>>>()?;
        dataset_vars.push(vars);
    }

    let channels = (0..counts.channels)
        .map(|channel| read_channel(lib, handle, channel))
        .collect::<Result<Vec<_>>>()?;

    let mut calibrations = Vec::with_capacity(counts.channels);
    for channel in 0..counts.channels {
        let per_sweep = (1..=counts.datasets)
            .map(|dataset| read_calibration(lib, handle, channel, dataset))
            .collect::<Result<Vec<_>>>()?;
        calibrations.push(per_sweep);
    }

    Ok(Descriptors {
        info,
        counts,
        file_vars,
        dataset_vars,
        channels,
        calibrations,
    })
}

/// Validates the structural counts of the file.
fn read_counts<L: CfsLibrary + ?Sized>(lib: &mut L, handle: FileHandle) -> Result<FileCounts> {
    let raw = lib.file_info(handle)?;

    let non_negative = |what: &'static str, value: i16| -> Result<usize> {
        usize::try_from(value).map_err(|_| CfsError::InvalidCount {
            what,
            value: value as i64,
        })
    };

    let counts = FileCounts {
        channels: non_negative("channel count", raw.channels)?,
        file_vars: non_negative("file variable count", raw.file_vars)?,
        dataset_vars: non_negative("dataset variable count", raw.dataset_vars)?,
        datasets: raw.datasets as usize,
    };

    if counts.channels == 0 {
        return Err(CfsError::InvalidCount {
            what: "channel count",
            value: 0,
        });
    }
    if counts.datasets == 0 {
        return Err(CfsError::InvalidCount {
            what: "dataset count",
            value: 0,
        });
    }

    debug!(
        "{} channels, {} file variables, {} dataset variables, {} datasets",
        counts.channels, counts.file_vars, counts.dataset_vars, counts.datasets
    );
    Ok(counts)
}

/// Reads one variable: descriptor first, then a value buffer sized from it.
fn read_variable<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
    var: usize,
    scope: VarScope,
    dataset: usize,
) -> Result<VariableDescriptor> {
    let desc = lib.var_desc(handle, var, scope)?;
    let var_type = VarType::from_code(desc.type_code)?;
    let size = usize::try_from(desc.size).map_err(|_| CfsError::InvalidCount {
        what: "variable size",
        value: desc.size as i64,
    })?;

    let value = if var_type == VarType::FixedString {
        // Room for the terminator
        let mut buf = vec![0u8; size + 1];
        lib.var_value(handle, var, scope, dataset, &mut buf)?;
        VarValue::Text(decode_string(&buf))
    } else {
        let mut buf = vec![0u8; size.max(SCALAR_BUFFER_LEN)];
        lib.var_value(handle, var, scope, dataset, &mut buf)?;
        decode_scalar(var_type, &buf)?
    };

    Ok(VariableDescriptor {
        description: desc.description,
        size: desc.size,
        units: desc.units,
        var_type,
        value,
    })
}

fn read_channel<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
    channel: usize,
) -> Result<ChannelDescriptor> {
    let raw = lib.file_chan(handle, channel)?;
    let descriptor = ChannelDescriptor {
        index: channel,
        name: raw.name,
        x_units: raw.x_units,
        y_units: raw.y_units,
        var_type: VarType::from_code(raw.type_code)?,
        kind: raw.kind,
        spacing: raw.spacing,
        other: raw.other,
    };

    debug!(
        "Channel {}: '{}' ({}, {} per {})",
        channel,
        descriptor.name,
        descriptor.var_type.cfs_name(),
        descriptor.y_units,
        descriptor.x_units
    );
    Ok(descriptor)
}

fn read_calibration<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
    channel: usize,
    dataset: usize,
) -> Result<DatasetChannelCalibration> {
    let raw = lib.ds_chan(handle, channel, dataset)?;
    let point_count = usize::try_from(raw.points).map_err(|_| CfsError::InvalidCount {
        what: "point count",
        value: raw.points,
    })?;

    Ok(DatasetChannelCalibration {
        channel,
        dataset,
        start_offset: raw.start_offset,
        point_count,
        y_scale: raw.y_scale,
        y_offset: raw.y_offset,
        x_scale: raw.x_scale,
        x_offset: raw.x_offset,
    })
}

/// Reads the sweeps of every channel, in ascending sweep order.
///
/// Reads that return no points are left out and reported separately.
pub(crate) fn read_all_sweeps<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
    descriptors: &Descriptors,
) -> Result<(Vec<ChannelSweeps>, Vec<FailedRead>)> {
    let mut channels = Vec::with_capacity(descriptors.channels.len());
    let mut failed = Vec::new();

    for (channel, calibrations) in descriptors.channels.iter().zip(&descriptors.calibrations) {
        let mut sweeps = Vec::with_capacity(calibrations.len());

        for (index, calibration) in calibrations.iter().enumerate() {
            match read_sweep(lib, handle, channel, index, calibration)? {
                SweepRead::Data(sweep) => sweeps.push(sweep),
                SweepRead::Empty(points_read) => {
                    warn!(
                        "No data for channel {} ('{}'), sweep {} (read returned {})",
                        channel.index, channel.name, index, points_read
                    );
                    failed.push(FailedRead {
                        channel: channel.index,
                        sweep: index,
                        points_read,
                    });
                }
            }
        }

        debug!(
            "Channel {}: {} of {} sweeps decoded",
            channel.index,
            sweeps.len(),
            calibrations.len()
        );
        channels.push(ChannelSweeps {
            descriptor: channel.clone(),
            sweeps,
        });
    }

    Ok((channels, failed))
}

#[derive(Debug)]
enum SweepRead {
    Data(Sweep),
    Empty(i64),
}

/// Reads and calibrates one (channel, sweep) pair.
fn read_sweep<L: CfsLibrary + ?Sized>(
    lib: &mut L,
    handle: FileHandle,
    channel: &ChannelDescriptor,
    index: usize,
    calibration: &DatasetChannelCalibration,
) -> Result<SweepRead> {
    let var_type = channel.var_type;
    let num_points = calibration.point_count;

    // The library returns Y and X interleaved as two equal halves
    let mut buf = vec![0u8; 2 * num_points * var_type.width()];
    let points_read = lib.chan_data(handle, channel.index, calibration.dataset, 0, 0, &mut buf)?;
    if points_read <= 0 {
        return Ok(SweepRead::Empty(points_read));
    }
    if points_read as usize != num_points {
        return Err(CfsError::ShortRead {
            channel: channel.index,
            sweep: index,
            expected: num_points,
            read: points_read,
        });
    }

    let raw = decode_samples(var_type, &buf)?;
    // The X half is zero-filled for equally spaced data and is rebuilt below
    let (y_raw, _x_raw) = raw.split_at(num_points);

    Ok(SweepRead::Data(Sweep {
        index,
        x: time_axis(num_points, calibration.x_offset, calibration.x_scale),
        y: calibrate(y_raw, var_type, calibration.y_scale, calibration.y_offset),
        calibration: *calibration,
    }))
}

/// Converts raw samples to physical units.
///
/// Wide integer samples are already in physical units and pass through.
pub(crate) fn calibrate(raw: &[f64], var_type: VarType, y_scale: f32, y_offset: f32) -> Array1<f64> {
    if var_type.is_wide_integer() {
        return Array1::from(raw.to_vec());
    }
    let scale = y_scale as f64;
    let offset = y_offset as f64;
    raw.iter().map(|&v| v * scale + offset).collect()
}

/// Rebuilds equally spaced sample times as a running sum from `x_offset`.
pub(crate) fn time_axis(num_points: usize, x_offset: f32, x_scale: f32) -> Array1<f64> {
    let step = x_scale as f64;
    let mut t = x_offset as f64;
    let mut x = Array1::<f64>::zeros(num_points);
    for (i, value) in x.iter_mut().enumerate() {
        if i > 0 {
            t += step;
        }
        *value = t;
    }
    x
}

/// Decodes a native sample buffer of `var_type` slots.
pub(crate) fn decode_samples(var_type: VarType, buf: &[u8]) -> Result<Vec<f64>> {
    if var_type == VarType::FixedString {
        return Err(CfsError::Inconsistent(
            "channel declares string samples".to_string(),
        ));
    }

    let count = buf.len() / var_type.width();
    let mut reader = Cursor::new(buf);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read_number(&mut reader, var_type)?);
    }
    Ok(values)
}

fn read_number(reader: &mut Cursor<&[u8]>, var_type: VarType) -> Result<f64> {
    Ok(match var_type {
        VarType::Int16 | VarType::Int16Alt => reader.read_i16::<LittleEndian>()? as f64,
        VarType::UInt16 | VarType::UInt16Alt => reader.read_u16::<LittleEndian>()? as f64,
        VarType::Int32 => reader.read_i32::<LittleEndian>()? as f64,
        VarType::Float32 => reader.read_f32::<LittleEndian>()? as f64,
        VarType::Float64 => reader.read_f64::<LittleEndian>()?,
        VarType::FixedString => reader.read_u8()? as f64,
    })
}

/// Decodes a scalar variable value.
pub(crate) fn decode_scalar(var_type: VarType, buf: &[u8]) -> Result<VarValue> {
    let mut reader = Cursor::new(buf);
    Ok(match var_type {
        VarType::Int16 | VarType::Int16Alt => VarValue::Int(reader.read_i16::<LittleEndian>()? as i64),
        VarType::UInt16 | VarType::UInt16Alt => {
            VarValue::Int(reader.read_u16::<LittleEndian>()? as i64)
        }
        VarType::Int32 => VarValue::Int(reader.read_i32::<LittleEndian>()? as i64),
        VarType::Float32 => VarValue::Float(reader.read_f32::<LittleEndian>()? as f64),
        VarType::Float64 => VarValue::Float(reader.read_f64::<LittleEndian>()?),
        VarType::FixedString => VarValue::Text(decode_string(buf)),
    })
}

/// Decodes a NUL-terminated string buffer; text is kept as stored.
fn decode_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn apply_read_policy(options: &LoadOptions, failed_reads: &[FailedRead]) -> Result<()> {
    if failed_reads.is_empty() {
        return Ok(());
    }
    match options.on_empty_read {
        EmptyReadPolicy::Skip => {
            info!("Skipped {} reads without data", failed_reads.len());
            Ok(())
        }
        EmptyReadPolicy::Fail => Err(CfsError::EmptyReads {
            reads: failed_reads.to_vec(),
        }),
    }
}

fn check_uniform_sweeps(channels: &[ChannelSweeps]) -> Result<()> {
    match channels.iter().find(|c| !c.is_uniform()) {
        Some(channel) => Err(CfsError::RaggedChannel {
            channel: channel.descriptor.index,
            lengths: channel.lengths(),
        }),
        None => Ok(()),
    }
}

fn log_file_summary(cfs: &CfsFile) {
    info!(
        "Read CFS file {} ({} {}): {} channels, {} sweeps",
        cfs.id, cfs.info.date, cfs.info.time, cfs.channel_count, cfs.sweep_count
    );
    if !cfs.info.comment.is_empty() {
        info!("Comment: {}", cfs.info.comment);
    }
    for channel in &cfs.channels {
        debug!(
            "  {}: {} [{}] {} sweeps",
            channel.descriptor.index,
            channel.descriptor.name,
            channel.descriptor.y_units,
            channel.sweeps.len()
        );
    }
    match cfs.data_rate() {
        Some(rate) => info!("Sample rate: {:.1} Hz", rate),
        None => debug!("Sample rate unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{MockChannel, MockLibrary, MockSweep, MockVar};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn time_axis_is_a_running_sum() {
        let x = time_axis(4, 0.5, 0.25);
        assert_eq!(x.to_vec(), vec![0.5, 0.75, 1.0, 1.25]);
        assert!(time_axis(0, 0.0, 0.1).is_empty());
    }

    #[test]
    fn calibration_skips_wide_integers() {
        let raw = [1.0, -2.0, 3.0];
        let scaled = calibrate(&raw, VarType::Int16, 0.5, 1.0);
        assert_eq!(scaled.to_vec(), vec![1.5, 0.0, 2.5]);

        let unscaled = calibrate(&raw, VarType::Int32, 0.5, 1.0);
        assert_eq!(unscaled.to_vec(), raw.to_vec());
    }

    #[test]
    fn decodes_each_sample_width() {
        let buf = [0xFFu8, 0xFF, 0x02, 0x00];
        assert_eq!(decode_samples(VarType::Int16, &buf).unwrap(), vec![-1.0, 2.0]);
        assert_eq!(decode_samples(VarType::UInt16Alt, &buf).unwrap(), vec![65535.0, 2.0]);
        assert_eq!(decode_samples(VarType::Int32, &buf).unwrap(), vec![196607.0]);

        let float = 1.5f32.to_le_bytes();
        assert_eq!(decode_samples(VarType::Float32, &float).unwrap(), vec![1.5]);
        assert!(decode_samples(VarType::FixedString, &buf).is_err());
    }

    #[test]
    fn decodes_scalar_values() {
        let buf = (-7i32).to_le_bytes();
        assert_eq!(decode_scalar(VarType::Int32, &buf).unwrap(), VarValue::Int(-7));
        let buf = 2.25f64.to_le_bytes();
        assert_eq!(decode_scalar(VarType::Float64, &buf).unwrap(), VarValue::Float(2.25));
        assert_eq!(decode_string(b"Cell 1  \0garbage"), "Cell 1  ");
    }

    #[test]
    fn reads_variables_descriptor_before_value() {
        let mut lib = MockLibrary::new(1)
            .with_file_var(MockVar::new("Operator", "", VarType::FixedString, VarValue::Text("JB".into())))
            .with_file_var(MockVar::new("Gain", "x", VarType::Float32, VarValue::Float(2.5)))
            .with_channel(MockChannel::new("Im", "pA", VarType::Int16).with_sweep(MockSweep::new(vec![0.0; 4], 0.1, 0.0)));

        let handle = lib.open_file(Path::new(MockLibrary::PATH)).unwrap();
        let desc = read_descriptors(&mut lib, handle).unwrap();

        assert_eq!(desc.file_vars[0].value, VarValue::Text("JB".into()));
        assert_eq!(desc.file_vars[0].var_type, VarType::FixedString);
        assert_eq!(desc.file_vars[1].value, VarValue::Float(2.5));
        assert_eq!(desc.file_vars[1].units, "x");

        let calls: Vec<&str> = lib
            .journal
            .iter()
            .filter(|c| c.starts_with("GetVar"))
            .map(|c| c.as_str())
            .collect();
        assert!(calls[0].starts_with("GetVarDesc(var=0"));
        assert!(calls[1].starts_with("GetVarVal(var=0"));
        assert!(calls[2].starts_with("GetVarDesc(var=1"));
        assert!(calls[3].starts_with("GetVarVal(var=1"));
    }

    #[test]
    fn reads_calibration_per_channel_and_dataset() {
        let mut lib = MockLibrary::new(2).with_channel(
            MockChannel::new("Vm", "mV", VarType::Int16)
                .with_sweep(MockSweep::new(vec![1.0; 3], 0.01, 0.0).scaled(0.1, 0.0))
                .with_sweep(MockSweep::new(vec![1.0; 5], 0.02, 1.0).scaled(0.2, -3.0)),
        );
        let handle = lib.open_file(Path::new(MockLibrary::PATH)).unwrap();
        let desc = read_descriptors(&mut lib, handle).unwrap();

        let second = desc.calibrations[0][1];
        assert_eq!(second.dataset, 2);
        assert_eq!(second.point_count, 5);
        assert_eq!(second.y_offset, -3.0);
        assert_close(second.x_scale as f64, 0.02);
    }

    #[test]
    fn rejects_files_without_sweeps() {
        let mut lib = MockLibrary::new(0).with_channel(MockChannel::new("Vm", "mV", VarType::Int16));
        let handle = lib.open_file(Path::new(MockLibrary::PATH)).unwrap();
        assert!(matches!(
            read_descriptors(&mut lib, handle),
            Err(CfsError::InvalidCount { what: "dataset count", .. })
        ));
    }

    #[test]
    fn rejects_negative_point_counts() {
        let mut sweep = MockSweep::new(vec![1.0; 3], 0.01, 0.0);
        sweep.points = Some(-1);
        let mut lib = MockLibrary::new(1)
            .with_channel(MockChannel::new("Vm", "mV", VarType::Int16).with_sweep(sweep));
        let handle = lib.open_file(Path::new(MockLibrary::PATH)).unwrap();
        assert!(matches!(
            read_descriptors(&mut lib, handle),
            Err(CfsError::InvalidCount { what: "point count", value: -1 })
        ));
    }

    #[test]
    fn partial_sample_read_is_an_error() {
        let mut sweep = MockSweep::new(vec![10.0, 20.0, 30.0], 0.1, 0.0).scaled(1.0, 5.0);
        sweep.points = Some(5);
        let mut lib = MockLibrary::new(1)
            .with_channel(MockChannel::new("Vm", "mV", VarType::Int16).with_sweep(sweep));

        let err = load_file(MockLibrary::PATH, &mut lib, &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CfsError::ShortRead { channel: 0, sweep: 0, expected: 5, read: 3 }
        ));
        assert_eq!(lib.close_count(), 1);
    }

    #[test]
    fn string_variables_keep_trailing_spaces() {
        let mut lib = MockLibrary::new(1)
            .with_file_var(MockVar::new("Label", "", VarType::FixedString, VarValue::Text("a b  ".into())))
            .with_channel(MockChannel::new("Im", "pA", VarType::Int16).with_sweep(MockSweep::new(vec![0.0; 2], 0.1, 0.0)));
        let handle = lib.open_file(Path::new(MockLibrary::PATH)).unwrap();
        let desc = read_descriptors(&mut lib, handle).unwrap();
        assert_eq!(desc.file_vars[0].value, VarValue::Text("a b  ".into()));
    }

    #[test]
    fn recognises_cfs_extension() {
        assert!(has_cfs_extension(Path::new("a/b/cell.cfs")));
        assert!(has_cfs_extension(Path::new("CELL.CFS")));
        assert!(!has_cfs_extension(Path::new("cell.json")));
        assert!(!has_cfs_extension(Path::new("cfs")));
    }
}

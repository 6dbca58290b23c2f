//! The "current sweep" view over a loaded recording.
//!
//! [`CfsFile::set_sweep`] points a [`SweepCursor`] at one pre-decoded sweep of
//! one channel. Nothing is re-read from the file; the cursor holds copies of
//! the selected arrays with units normalised and labels filled in the way
//! pyABF-based tooling expects.

use ndarray::Array1;

use crate::config::TimeOffsetMode;
use crate::error::{CfsError, Result};
use crate::types::{CfsFile, ChannelSweeps, Sweep};

const UNITS_X: &str = "sec";
const LABEL_X: &str = "Time (seconds)";
const LABEL_D: &str = "Digital Output (V)";
// Time-axis units accepted by `check`
const SECONDS: [&str; 4] = ["s", "sec", "secs", "seconds"];

/// The selected sweep of a [`CfsFile`].
#[derive(Debug, Clone, PartialEq)]
pub struct SweepCursor {
    /// 0-based sweep number
    pub sweep_number: usize,
    pub sweep_channel: usize,
    /// Whether `sweep_x` is offset by the time of earlier sweeps
    pub absolute_time: bool,
    /// Sample times (seconds)
    pub sweep_x: Array1<f64>,
    /// Signal of the selected channel, in `sweep_units_y`
    pub sweep_y: Array1<f64>,
    /// Stimulus trace: the same sweep of channel 0, in `sweep_units_c`.
    ///
    /// Channel 0 goes through the same unit normalisation as the signal, so
    /// a `uV` stimulus is reported in `mV` and scaled by 0.001.
    pub sweep_c: Array1<f64>,
    pub sweep_units_x: String,
    pub sweep_units_y: String,
    pub sweep_units_c: String,
    pub sweep_label_x: String,
    pub sweep_label_y: String,
    pub sweep_label_c: String,
    pub sweep_label_d: String,
    pub sweep_point_count: usize,
}

/// Normalises a units string, returning the units and the factor to apply
/// to the data.
///
/// Spellings of picoamps collapse to `pA`. Traces labelled `uV` are
/// relabelled `mV` and scaled by 0.001.
///
/// ```
/// use cfs_importer::sweep::normalize_units;
///
/// assert_eq!(normalize_units(" pAmp "), ("pA".to_string(), 1.0));
/// assert_eq!(normalize_units("uV"), ("mV".to_string(), 0.001));
/// assert_eq!(normalize_units("mV"), ("mV".to_string(), 1.0));
/// ```
pub fn normalize_units(units: &str) -> (String, f64) {
    let trimmed = units.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "pa" | "pamp" | "pamps" => ("pA".to_string(), 1.0),
        _ if matches!(trimmed, "uV" | "µV" | "μV") => ("mV".to_string(), 0.001),
        _ => (trimmed.to_string(), 1.0),
    }
}

/// Y and command labels for a trace in `units_y`.
fn labels(name_y: &str, units_y: &str, name_c: &str, units_c: &str) -> (String, String) {
    match units_y {
        "pA" => (
            "Clamp Current (pA)".to_string(),
            "Membrane Potential (mV)".to_string(),
        ),
        "mV" => (
            "Membrane Potential (mV)".to_string(),
            "Applied Current (pA)".to_string(),
        ),
        _ => (
            format!("{} ({})", name_y, units_y),
            format!("{} ({})", name_c, units_c),
        ),
    }
}

impl CfsFile {
    /// Selects a sweep of a channel and returns the updated cursor.
    ///
    /// With `absolute_time`, the X array is shifted by the time of all earlier
    /// sweeps of the channel, computed according to
    /// [`LoadOptions::time_offset`](crate::LoadOptions::time_offset).
    ///
    /// # Errors
    ///
    /// * [`CfsError::SweepOutOfRange`] if `sweep >= sweep_count`
    /// * [`CfsError::ChannelOutOfRange`] if `channel >= channel_count`
    /// * [`CfsError::MissingSweep`] if the sweep was skipped at load time
    pub fn set_sweep(
        &mut self,
        sweep: usize,
        channel: usize,
        absolute_time: bool,
    ) -> Result<&SweepCursor> {
        if sweep >= self.sweep_count {
            return Err(CfsError::SweepOutOfRange {
                index: sweep,
                max: self.sweep_count.saturating_sub(1),
            });
        }

        let data = self.channel(channel)?;
        let selected = data
            .get(sweep)
            .ok_or(CfsError::MissingSweep { channel, sweep })?;

        let (units_y, factor_y) = normalize_units(&data.descriptor.y_units);
        let stimulus = self.channel(0)?;
        let (units_c, factor_c) = normalize_units(&stimulus.descriptor.y_units);
        let sweep_c = stimulus
            .get(sweep)
            .map(|s| &s.y * factor_c)
            .unwrap_or_else(|| Array1::zeros(0));

        let (label_y, label_c) = labels(
            &data.descriptor.name,
            &units_y,
            &stimulus.descriptor.name,
            &units_c,
        );

        let sweep_x = if absolute_time {
            &selected.x + self.time_offset(data, sweep)
        } else {
            selected.x.clone()
        };

        let cursor = SweepCursor {
            sweep_number: sweep,
            sweep_channel: channel,
            absolute_time,
            sweep_x,
            sweep_y: &selected.y * factor_y,
            sweep_c,
            sweep_units_x: UNITS_X.to_string(),
            sweep_units_y: units_y,
            sweep_units_c: units_c,
            sweep_label_x: LABEL_X.to_string(),
            sweep_label_y: label_y,
            sweep_label_c: label_c,
            sweep_label_d: LABEL_D.to_string(),
            sweep_point_count: selected.len(),
        };

        Ok(&*self.cursor.insert(cursor))
    }

    /// The selected sweep, or `None` before the first `set_sweep`.
    pub fn cursor(&self) -> Option<&SweepCursor> {
        self.cursor.as_ref()
    }

    /// Time at which `sweep` starts relative to the first sweep of `channel`.
    fn time_offset(&self, channel: &ChannelSweeps, sweep: usize) -> f64 {
        let earlier = channel.sweeps.iter().take_while(|s| s.index < sweep);
        match self.options.time_offset {
            TimeOffsetMode::Elapsed => earlier.map(Sweep::duration).sum(),
            TimeOffsetMode::LegacySignalSum => earlier.filter_map(|s| s.y.last().copied()).sum(),
        }
    }

    /// Checks that the recording can be converted.
    ///
    /// Visits every decoded sweep of every channel and fails on an empty
    /// recording, a channel timed in other units than seconds, or a stimulus
    /// trace containing NaN. The selected sweep is left unchanged.
    pub fn check(&mut self) -> Result<()> {
        if self.channel_count == 0 {
            return Err(CfsError::Inconsistent("found no channels".to_string()));
        }
        if self.sweep_count == 0 {
            return Err(CfsError::Inconsistent("found no sweeps".to_string()));
        }
        let first_points = self
            .channels
            .first()
            .and_then(|c| c.sweeps.first())
            .map_or(0, Sweep::len);
        if first_points == 0 {
            return Err(CfsError::Inconsistent(
                "the number of data points is not larger than zero".to_string(),
            ));
        }

        let previous = self.cursor.take();
        let result = self.check_all_sweeps();
        self.cursor = previous;
        result
    }

    fn check_all_sweeps(&mut self) -> Result<()> {
        for sweep in 0..self.sweep_count {
            for channel in 0..self.channel_count {
                let x_units = self.channels[channel].descriptor.x_units.trim();
                if !SECONDS.contains(&x_units) {
                    return Err(CfsError::Inconsistent(format!(
                        "unexpected x units of {} on channel {}",
                        x_units, channel
                    )));
                }

                let cursor = match self.set_sweep(sweep, channel, false) {
                    Ok(cursor) => cursor,
                    Err(CfsError::MissingSweep { .. }) => continue,
                    Err(e) => return Err(e),
                };

                if cursor.sweep_c.iter().any(|v| v.is_nan()) {
                    return Err(CfsError::Inconsistent(format!(
                        "found at least one 'Not a Number' entry in stimulus channel {} of sweep {}",
                        channel, sweep
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use crate::native::{MockChannel, MockLibrary, MockSweep};
    use crate::reader::load_file;
    use crate::types::VarType;

    fn two_channel_file(options: &LoadOptions) -> CfsFile {
        let mut lib = MockLibrary::new(3)
            .with_channel(
                MockChannel::new("Im", "pAmp", VarType::Int16)
                    .with_sweep(MockSweep::new(vec![1.0, 2.0, 3.0, 4.0], 0.5, 0.0))
                    .with_sweep(MockSweep::new(vec![5.0, 6.0, 7.0, 8.0], 0.5, 0.0))
                    .with_sweep(MockSweep::new(vec![9.0, 10.0, 11.0, 12.0], 0.5, 0.0)),
            )
            .with_channel(
                MockChannel::new("Vm", "uV", VarType::Int16)
                    .with_sweep(MockSweep::new(vec![100.0, 200.0, 300.0, 400.0], 0.5, 0.0))
                    .with_sweep(MockSweep::new(vec![0.0; 4], 0.5, 0.0).unreadable())
                    .with_sweep(MockSweep::new(vec![500.0, 600.0, 700.0, 800.0], 0.5, 0.0)),
            );
        load_file(MockLibrary::PATH, &mut lib, options).unwrap()
    }

    #[test]
    fn normalises_unit_spellings() {
        assert_eq!(normalize_units("pa").0, "pA");
        assert_eq!(normalize_units("PAMP").0, "pA");
        assert_eq!(normalize_units(" mV ").0, "mV");
        assert_eq!(normalize_units("V"), ("V".to_string(), 1.0));
        assert_eq!(normalize_units("μV"), ("mV".to_string(), 0.001));
    }

    #[test]
    fn cursor_starts_unset() {
        let cfs = two_channel_file(&LoadOptions::default());
        assert!(cfs.cursor().is_none());
    }

    #[test]
    fn selects_sweep_with_labels_and_units() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        let cursor = cfs.set_sweep(1, 0, false).unwrap().clone();

        assert_eq!(cursor.sweep_number, 1);
        assert_eq!(cursor.sweep_units_x, "sec");
        assert_eq!(cursor.sweep_units_y, "pA");
        assert_eq!(cursor.sweep_units_c, "pA");
        assert_eq!(cursor.sweep_label_y, "Clamp Current (pA)");
        assert_eq!(cursor.sweep_label_c, "Membrane Potential (mV)");
        assert_eq!(cursor.sweep_label_x, "Time (seconds)");
        assert_eq!(cursor.sweep_y.to_vec(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(cursor.sweep_c, cursor.sweep_y);
        assert_eq!(cursor.sweep_x.to_vec(), vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(cursor.sweep_point_count, 4);
        assert_eq!(cfs.cursor(), Some(&cursor));
    }

    #[test]
    fn microvolts_become_scaled_millivolts() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        let cursor = cfs.set_sweep(0, 1, false).unwrap();
        assert_eq!(cursor.sweep_units_y, "mV");
        assert_eq!(cursor.sweep_label_y, "Membrane Potential (mV)");
        let expected = [0.1, 0.2, 0.3, 0.4];
        for (got, want) in cursor.sweep_y.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_out_of_range_sweeps_and_channels() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        let err = cfs.set_sweep(5, 0, false).unwrap_err();
        assert!(matches!(err, CfsError::SweepOutOfRange { index: 5, max: 2 }));
        assert!(err.to_string().contains("0–2"));

        assert!(matches!(
            cfs.set_sweep(0, 2, false),
            Err(CfsError::ChannelOutOfRange { index: 2, count: 2 })
        ));
        for sweep in 0..3 {
            assert!(cfs.set_sweep(sweep, 0, false).is_ok());
        }
    }

    #[test]
    fn skipped_sweeps_are_reported_on_selection() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        assert!(matches!(
            cfs.set_sweep(1, 1, false),
            Err(CfsError::MissingSweep { channel: 1, sweep: 1 })
        ));
        // sweep 2 still resolves to the third dataset
        let cursor = cfs.set_sweep(2, 1, false).unwrap();
        assert!((cursor.sweep_y[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn absolute_time_adds_elapsed_duration() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        let cursor = cfs.set_sweep(2, 0, true).unwrap();
        // two earlier sweeps of 4 points at 0.5 s
        assert_eq!(cursor.sweep_x.to_vec(), vec![4.0, 4.5, 5.0, 5.5]);
        assert!(cursor.absolute_time);
    }

    #[test]
    fn legacy_offset_sums_final_signal_values() {
        let options = LoadOptions {
            time_offset: TimeOffsetMode::LegacySignalSum,
            ..LoadOptions::default()
        };
        let mut cfs = two_channel_file(&options);
        let cursor = cfs.set_sweep(2, 0, true).unwrap();
        // last Y of sweeps 0 and 1: 4 + 8
        assert_eq!(cursor.sweep_x[0], 12.0);
    }

    #[test]
    fn check_passes_and_keeps_cursor() {
        let mut cfs = two_channel_file(&LoadOptions::default());
        cfs.set_sweep(2, 1, false).unwrap();
        cfs.check().unwrap();
        let cursor = cfs.cursor().unwrap();
        assert_eq!((cursor.sweep_number, cursor.sweep_channel), (2, 1));
    }

    #[test]
    fn check_rejects_nan_stimulus() {
        let mut lib = MockLibrary::new(1).with_channel(
            MockChannel::new("Cmd", "mV", VarType::Float32)
                .with_sweep(MockSweep::new(vec![1.0, f64::NAN], 0.1, 0.0)),
        );
        let mut cfs = load_file(MockLibrary::PATH, &mut lib, &LoadOptions::default()).unwrap();
        let err = cfs.check().unwrap_err();
        assert!(err.to_string().contains("Not a Number"));
    }
}

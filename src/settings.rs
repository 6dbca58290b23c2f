//! Experiment settings stored next to the recordings as JSON.
//!
//! Acquisition rigs write a JSON file per recording (`cell1.cfs` →
//! `cell1.json`) or a single JSON file per folder. It carries stimulus scale
//! factors per stimulus set and the amplifier state of every channel. Every
//! lookup falls back to a neutral value with a warning, since settings files
//! are optional.

use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CfsError, Result};

pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

/// Recording mode of an amplifier channel, as stored under `GetMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampMode {
    VoltageClamp,
    CurrentClamp,
    /// Current clamp with zero holding current ("I=0")
    NoClamp,
}

impl ClampMode {
    pub fn code(self) -> i64 {
        match self {
            ClampMode::VoltageClamp => 0,
            ClampMode::CurrentClamp => 1,
            ClampMode::NoClamp => 2,
        }
    }
}

/// Voltage-clamp compensation settings; unset values are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageClampSettings {
    pub capacitance_slow: f64,
    pub capacitance_fast: f64,
    pub resistance_comp_correction: f64,
    pub resistance_comp_bandwidth: f64,
    pub resistance_comp_prediction: f64,
    pub whole_cell_capacitance_comp: f64,
    pub whole_cell_series_resistance_comp: f64,
}

impl Default for VoltageClampSettings {
    fn default() -> Self {
        VoltageClampSettings {
            capacitance_slow: f64::NAN,
            capacitance_fast: f64::NAN,
            resistance_comp_correction: f64::NAN,
            resistance_comp_bandwidth: f64::NAN,
            resistance_comp_prediction: f64::NAN,
            whole_cell_capacitance_comp: f64::NAN,
            whole_cell_series_resistance_comp: f64::NAN,
        }
    }
}

/// Current-clamp settings; unset values are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentClampSettings {
    pub bias_current: f64,
    pub bridge_balance: f64,
    pub capacitance_compensation: f64,
}

impl Default for CurrentClampSettings {
    fn default() -> Self {
        CurrentClampSettings {
            bias_current: f64::NAN,
            bridge_balance: f64::NAN,
            capacitance_compensation: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmplifierSettings {
    VoltageClamp(VoltageClampSettings),
    CurrentClamp(CurrentClampSettings),
}

impl AmplifierSettings {
    /// All-NaN settings for `mode`.
    pub fn unknown(mode: ClampMode) -> Self {
        match mode {
            ClampMode::VoltageClamp => AmplifierSettings::VoltageClamp(Default::default()),
            ClampMode::CurrentClamp | ClampMode::NoClamp => {
                AmplifierSettings::CurrentClamp(Default::default())
            }
        }
    }
}

/// One amplifier block of a settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AmplifierBlock {
    #[serde(rename = "GetMode")]
    mode: Option<i64>,
    #[serde(rename = "GetSlowCompCap")]
    slow_comp_cap: Option<f64>,
    #[serde(rename = "GetFastCompCap")]
    fast_comp_cap: Option<f64>,
    #[serde(rename = "GetRsCompEnable", deserialize_with = "flag")]
    rs_comp_enable: bool,
    #[serde(rename = "GetRsCompCorrection")]
    rs_comp_correction: Option<f64>,
    #[serde(rename = "GetRsCompBandwidth")]
    rs_comp_bandwidth: Option<f64>,
    #[serde(rename = "GetRsCompPrediction")]
    rs_comp_prediction: Option<f64>,
    #[serde(rename = "GetWholeCellCompEnable", deserialize_with = "flag")]
    whole_cell_comp_enable: bool,
    #[serde(rename = "GetWholeCellCompCap")]
    whole_cell_comp_cap: Option<f64>,
    #[serde(rename = "GetWholeCellCompResist")]
    whole_cell_comp_resist: Option<f64>,
    #[serde(rename = "GetHoldingEnable", deserialize_with = "flag")]
    holding_enable: bool,
    #[serde(rename = "GetHolding")]
    holding: Option<f64>,
    #[serde(rename = "GetBridgeBalEnable", deserialize_with = "flag")]
    bridge_bal_enable: bool,
    #[serde(rename = "GetBridgeBalResist")]
    bridge_bal_resist: Option<f64>,
    #[serde(rename = "GetNeutralizationEnable", deserialize_with = "flag")]
    neutralization_enable: bool,
    #[serde(rename = "GetNeutralizationCap")]
    neutralization_cap: Option<f64>,
}

/// Enable flags are written either as booleans or as 0/1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
        _ => false,
    })
}

fn gated(enabled: bool, value: Option<f64>) -> f64 {
    if enabled {
        value.unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

impl AmplifierBlock {
    fn settings(&self, mode: ClampMode) -> AmplifierSettings {
        match mode {
            ClampMode::VoltageClamp => AmplifierSettings::VoltageClamp(VoltageClampSettings {
                capacitance_slow: self.slow_comp_cap.unwrap_or(f64::NAN),
                capacitance_fast: self.fast_comp_cap.unwrap_or(f64::NAN),
                resistance_comp_correction: gated(self.rs_comp_enable, self.rs_comp_correction),
                resistance_comp_bandwidth: gated(self.rs_comp_enable, self.rs_comp_bandwidth),
                resistance_comp_prediction: gated(self.rs_comp_enable, self.rs_comp_prediction),
                whole_cell_capacitance_comp: gated(
                    self.whole_cell_comp_enable,
                    self.whole_cell_comp_cap,
                ),
                whole_cell_series_resistance_comp: gated(
                    self.whole_cell_comp_enable,
                    self.whole_cell_comp_resist,
                ),
            }),
            ClampMode::CurrentClamp | ClampMode::NoClamp => {
                AmplifierSettings::CurrentClamp(CurrentClampSettings {
                    bias_current: gated(self.holding_enable, self.holding),
                    bridge_balance: gated(self.bridge_bal_enable, self.bridge_bal_resist),
                    capacitance_compensation: gated(
                        self.neutralization_enable,
                        self.neutralization_cap,
                    ),
                })
            }
        }
    }
}

/// Settings files found for a recording or a folder of recordings.
///
/// Entries are keyed by the CFS file they belong to, or by the folder when a
/// single JSON file covers the whole folder.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    entries: HashMap<PathBuf, Value>,
    enabled: bool,
}

impl Settings {
    /// Settings that answer every lookup with the defaults, silently.
    pub fn disabled() -> Self {
        Settings::default()
    }

    /// Searches the settings files for a CFS file or a folder of CFS files.
    ///
    /// For a file, `<stem>.json` next to it is used. For a folder, a single
    /// JSON file applies to every recording in it; with several, each
    /// `<stem>.cfs` is paired with `<stem>.json`.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = Settings {
            entries: HashMap::new(),
            enabled: true,
        };

        if path.is_file() {
            debug!("Searching JSON files for file conversion.");
            settings.add_entry(path)?;
            return Ok(settings);
        }

        if !path.is_dir() {
            return Err(CfsError::FileNotFound(path.to_path_buf()));
        }

        let json_files = files_with_extension(path, "json")?;
        debug!("Found {} JSON files for folder conversion.", json_files.len());

        match json_files.as_slice() {
            [] => warn!("Could not find any JSON file with settings."),
            [single] => {
                let value = load_json(single)?;
                settings.entries.insert(path.to_path_buf(), value);
            }
            _ => {
                for cfs in files_with_extension(path, "cfs")? {
                    settings.add_entry(&cfs)?;
                }
            }
        }

        Ok(settings)
    }

    fn add_entry(&mut self, cfs_path: &Path) -> Result<()> {
        let json = cfs_path.with_extension("json");
        if json.is_file() {
            let value = load_json(&json)?;
            self.entries.insert(cfs_path.to_path_buf(), value);
        } else {
            warn!(
                "Could not find the JSON file {} with settings.",
                json.display()
            );
        }
        Ok(())
    }

    /// The settings entry for a recording and the path it is keyed by:
    /// the file-specific one, else the folder-wide one.
    pub fn entry_for(&self, cfs_path: &Path) -> Option<(&Value, &Path)> {
        if let Some((key, value)) = self.entries.get_key_value(cfs_path) {
            return Some((value, key.as_path()));
        }
        let folder = cfs_path.parent()?;
        self.entries
            .get_key_value(folder)
            .map(|(key, value)| (value, key.as_path()))
    }

    /// Stimulus scale factor of `stimset`, defaulting to 1.0.
    pub fn scale_factor(&self, cfs_path: &Path, stimset: &str) -> f64 {
        if !self.enabled {
            return DEFAULT_SCALE_FACTOR;
        }

        let factor = self
            .entry_for(cfs_path)
            .and_then(|(entry, _)| entry.get("ScaleFactors")?.get(stimset)?.as_f64());

        factor.unwrap_or_else(|| {
            warn!(
                "Could not find the scale factor for the stimset {}, using {} as fallback.",
                stimset, DEFAULT_SCALE_FACTOR
            );
            DEFAULT_SCALE_FACTOR
        })
    }

    /// Amplifier settings of the channel named `adc_name`.
    ///
    /// The channel name (without spaces) is resolved through `uids` to an
    /// amplifier block. A missing block or a block recorded in another clamp
    /// mode yields all-NaN settings.
    pub fn amplifier_settings(
        &self,
        cfs_path: &Path,
        mode: ClampMode,
        adc_name: &str,
    ) -> AmplifierSettings {
        if !self.enabled {
            return AmplifierSettings::unknown(mode);
        }

        let key = adc_name.replace(' ', "");
        let amplifier = self
            .entry_for(cfs_path)
            .and_then(|(entry, _)| Some((entry, entry.get("uids")?.get(&key)?.as_str()?)));

        let Some((entry, amplifier)) = amplifier else {
            warn!("Could not find settings for the amplifier of channel {}.", adc_name);
            return AmplifierSettings::unknown(mode);
        };

        let block = entry
            .get(amplifier)
            .and_then(|v| AmplifierBlock::deserialize(v).ok());
        let Some(block) = block else {
            warn!(
                "Could not find settings for amplifier {} of channel {}.",
                amplifier, adc_name
            );
            return AmplifierSettings::unknown(mode);
        };

        if block.mode != Some(mode.code()) {
            warn!(
                "Stored clamp mode {:?} does not match requested clamp mode {:?} of channel {}.",
                block.mode, mode, adc_name
            );
            return AmplifierSettings::unknown(mode);
        }

        block.settings(mode)
    }
}

/// Protocol (stimulus set) name without its `_IN<n>` channel suffix.
///
/// ```
/// use cfs_importer::settings::protocol_name;
///
/// assert_eq!(protocol_name("Ramp_IN0"), "Ramp");
/// assert_eq!(protocol_name("Ramp_INx"), "Ramp_INx");
/// ```
pub fn protocol_name(name: &str) -> &str {
    if let Some(pos) = name.rfind("_IN") {
        let suffix = &name[pos + 3..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return &name[..pos];
        }
    }
    name
}

fn load_json(path: &Path) -> Result<Value> {
    debug!("Using JSON settings file {}.", path.display());
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| CfsError::Settings {
        path: path.to_path_buf(),
        source,
    })
}

fn files_with_extension(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const AMPLIFIER_JSON: &str = r#"{
        "ScaleFactors": { "Ramp": 2.5 },
        "uids": { "Vm1": "Amp 1" },
        "Amp 1": {
            "GetMode": 1,
            "GetHoldingEnable": true,
            "GetHolding": -5e-11,
            "GetBridgeBalEnable": 0,
            "GetBridgeBalResist": 1e7,
            "GetNeutralizationEnable": 1,
            "GetNeutralizationCap": 3e-12
        }
    }"#;

    #[test]
    fn file_settings_resolve_scale_and_amplifier() {
        let dir = tempfile::tempdir().unwrap();
        let cfs = dir.path().join("cell1.cfs");
        fs::write(&cfs, b"").unwrap();
        fs::write(dir.path().join("cell1.json"), AMPLIFIER_JSON).unwrap();

        let settings = Settings::discover(&cfs).unwrap();
        let (_, source) = settings.entry_for(&cfs).unwrap();
        assert_eq!(source, cfs.as_path());

        assert_eq!(settings.scale_factor(&cfs, "Ramp"), 2.5);
        assert_eq!(settings.scale_factor(&cfs, "Step"), DEFAULT_SCALE_FACTOR);

        match settings.amplifier_settings(&cfs, ClampMode::CurrentClamp, "Vm 1") {
            AmplifierSettings::CurrentClamp(ic) => {
                assert_eq!(ic.bias_current, -5e-11);
                assert!(ic.bridge_balance.is_nan());
                assert_eq!(ic.capacitance_compensation, 3e-12);
            }
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn mismatched_clamp_mode_gives_unknown_settings() {
        let dir = tempfile::tempdir().unwrap();
        let cfs = dir.path().join("cell1.cfs");
        fs::write(&cfs, b"").unwrap();
        fs::write(dir.path().join("cell1.json"), AMPLIFIER_JSON).unwrap();

        let settings = Settings::discover(&cfs).unwrap();
        match settings.amplifier_settings(&cfs, ClampMode::VoltageClamp, "Vm1") {
            AmplifierSettings::VoltageClamp(vc) => {
                assert!(vc.capacitance_slow.is_nan());
                assert!(vc.whole_cell_series_resistance_comp.is_nan());
            }
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn single_json_applies_to_whole_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.cfs"), b"").unwrap();
        fs::write(dir.path().join("b.cfs"), b"").unwrap();
        fs::write(dir.path().join("rig.json"), AMPLIFIER_JSON).unwrap();

        let settings = Settings::discover(dir.path()).unwrap();
        let b = dir.path().join("b.cfs");
        let (_, source) = settings.entry_for(&b).unwrap();
        assert_eq!(source, dir.path());
        assert_eq!(settings.scale_factor(&b, "Ramp"), 2.5);
    }

    #[test]
    fn several_json_files_pair_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.cfs"), b"").unwrap();
        fs::write(dir.path().join("b.cfs"), b"").unwrap();
        fs::write(dir.path().join("a.json"), r#"{"ScaleFactors": {"Ramp": 3.0}}"#).unwrap();
        fs::write(dir.path().join("other.json"), "{}").unwrap();

        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.scale_factor(&dir.path().join("a.cfs"), "Ramp"), 3.0);
        assert!(settings.entry_for(&dir.path().join("b.cfs")).is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfs = dir.path().join("cell.cfs");
        fs::write(&cfs, b"").unwrap();
        fs::write(dir.path().join("cell.json"), "{ not json").unwrap();

        assert!(matches!(
            Settings::discover(&cfs),
            Err(CfsError::Settings { .. })
        ));
    }

    #[test]
    fn disabled_settings_use_defaults() {
        let settings = Settings::disabled();
        let path = Path::new("any.cfs");
        assert_eq!(settings.scale_factor(path, "Ramp"), DEFAULT_SCALE_FACTOR);
        match settings.amplifier_settings(path, ClampMode::NoClamp, "Vm") {
            AmplifierSettings::CurrentClamp(ic) => assert!(ic.bias_current.is_nan()),
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn strips_channel_suffix_from_protocol() {
        assert_eq!(protocol_name("IV_curve_IN12"), "IV_curve");
        assert_eq!(protocol_name("IV_curve_IN"), "IV_curve_IN");
        assert_eq!(protocol_name("plain"), "plain");
    }
}

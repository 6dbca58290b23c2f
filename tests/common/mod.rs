/// Shared builders for mock-backed recordings.
use cfs_importer::native::{MockChannel, MockLibrary, MockSweep, MockVar};
use cfs_importer::{VarType, VarValue};

pub const POINTS: usize = 100;
pub const X_SCALE: f32 = 0.001;

#[allow(unused)]
pub fn ramp(len: usize, start: f64) -> Vec<f64> {
    (0..len).map(|i| start + i as f64).collect()
}

/// Two channels (`Im` in pA, `Vm` in mV), three sweeps of [`POINTS`] samples each.
#[allow(unused)]
pub fn two_channel_library() -> MockLibrary {
    let mut current = MockChannel::new("Im", "pA", VarType::Int16);
    let mut voltage = MockChannel::new("Vm", "mV", VarType::Float32);
    for sweep in 0..3 {
        current = current.with_sweep(
            MockSweep::new(ramp(POINTS, 10.0 * sweep as f64), X_SCALE, 0.0).scaled(0.5, 1.0),
        );
        voltage = voltage.with_sweep(MockSweep::new(
            ramp(POINTS, -70.0 + sweep as f64),
            X_SCALE,
            0.0,
        ));
    }

    MockLibrary::new(3)
        .with_info("15/06/22", "10:30:00", "patch clamp")
        .with_file_var(MockVar::new(
            "Experimenter",
            "",
            VarType::FixedString,
            VarValue::Text("anon".to_string()),
        ))
        .with_file_var(MockVar::new("Gain", "x", VarType::Float32, VarValue::Float(2.5)))
        .with_dataset_vars(
            (0..3)
                .map(|d| {
                    vec![MockVar::new(
                        "Sweep counter",
                        "",
                        VarType::Int32,
                        VarValue::Int(d + 1),
                    )]
                })
                .collect(),
        )
        .with_channel(current)
        .with_channel(voltage)
}

/// A single-channel recording on `date`, sampled every `x_scale` seconds.
#[allow(unused)]
pub fn single_channel_library(date: &str, x_scale: f32) -> MockLibrary {
    MockLibrary::new(1)
        .with_info(date, "09:00:00", "")
        .with_channel(
            MockChannel::new("Vm", "mV", VarType::Int16)
                .with_sweep(MockSweep::new(ramp(10, 0.0), x_scale, 0.0)),
        )
}

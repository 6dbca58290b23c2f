mod common;

use cfs_importer::native::{MockChannel, MockLibrary, MockSweep};
use cfs_importer::*;
use common::{ramp, single_channel_library, two_channel_library};
use std::fs;

#[test]
fn loads_cfs_files_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.cfs"), b"").unwrap();
    fs::write(dir.path().join("a.CFS"), b"").unwrap();
    fs::write(dir.path().join("notes.txt"), b"").unwrap();

    let mut lib = two_channel_library();
    let files = load_folder(dir.path(), &mut lib, &LoadOptions::default()).unwrap();

    let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(lib.open_count(), 2);
    assert_eq!(lib.close_count(), 2);
}

#[test]
fn folder_path_to_a_file_loads_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.cfs");
    fs::write(&path, b"").unwrap();

    let mut lib = two_channel_library();
    let files = load_folder(&path, &mut lib, &LoadOptions::default()).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, path);
}

#[test]
fn missing_folder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut lib = two_channel_library();
    assert!(matches!(
        load_folder(dir.path().join("absent"), &mut lib, &LoadOptions::default()),
        Err(CfsError::FileNotFound(_))
    ));
}

fn recording(date: &str, x_scale: f32) -> CfsFile {
    let mut lib = single_channel_library(date, x_scale);
    load(MockLibrary::PATH, &mut lib).unwrap()
}

#[test]
fn reference_is_the_oldest_recording() {
    let files = vec![
        recording("02/03/23", 0.001),
        recording("28/02/23", 0.001),
        recording("not a date", 0.001),
    ];
    let reference = reference_file(&files).unwrap();
    assert_eq!(reference.info.date, "28/02/23");

    assert!(reference_file(&[]).is_none());
}

#[test]
fn compatible_recordings_share_layout_and_rate() {
    let first = recording("01/01/23", 0.001);
    verify_compatibility(&first, &recording("02/01/23", 0.001)).unwrap();

    let err = verify_compatibility(&first, &recording("02/01/23", 0.002)).unwrap_err();
    assert!(err.to_string().contains("sample rates"), "{}", err);

    let mut lib = MockLibrary::new(1).with_channel(
        MockChannel::new("Im", "pA", VarType::Int16)
            .with_sweep(MockSweep::new(ramp(10, 0.0), 0.001, 0.0)),
    );
    let renamed = load(MockLibrary::PATH, &mut lib).unwrap();
    let err = verify_compatibility(&first, &renamed).unwrap_err();
    assert!(err.to_string().contains("names"), "{}", err);
}

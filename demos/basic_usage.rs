use cfs_importer::native::DynamicCfsLibrary;
use cfs_importer::settings::{protocol_name, Settings};
use cfs_importer::load;
use std::env;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <path to CFS library> <file.cfs>", args[0]);
        std::process::exit(2);
    }

    // Load the vendor library, then the recording
    let mut lib = DynamicCfsLibrary::open(&args[1])?;
    let path = Path::new(&args[2]);
    let mut cfs = load(path, &mut lib)?;

    // Print basic file information
    println!("File: {}", cfs.id);
    match cfs.datetime() {
        Some(started) => println!("Recorded: {}", started),
        None => println!("Recorded: {} {}", cfs.info.date, cfs.info.time),
    }
    if !cfs.info.comment.is_empty() {
        println!("Comment: {}", cfs.info.comment);
    }
    if let Some(rate) = cfs.data_rate() {
        println!("Sample rate: {:.1} Hz", rate);
    }
    println!("Number of sweeps: {}", cfs.sweep_count);

    // Channel information
    println!("\nChannels:");
    for channel in &cfs.channels {
        let d = &channel.descriptor;
        println!(
            "  {}: {} ({}, {}), {} sweeps",
            d.index,
            d.name,
            d.y_units,
            d.var_type.cfs_name(),
            channel.sweeps.len()
        );
    }

    if !cfs.file_vars.is_empty() {
        println!("\nFile variables:");
        for var in &cfs.file_vars {
            println!("  {} = {} {}", var.description, var.value, var.units);
        }
    }

    if !cfs.skipped_reads.is_empty() {
        println!("\n{} reads returned no data", cfs.skipped_reads.len());
    }

    // First sweep of every channel
    println!("\nFirst sweep:");
    for channel in cfs.channel_list() {
        let cursor = cfs.set_sweep(0, channel, false)?;
        let n = cursor.sweep_point_count;
        println!("  {} [{} points]", cursor.sweep_label_y, n);
        if n > 0 {
            println!(
                "    {:.4} {} .. {:.4} {}",
                cursor.sweep_x[0],
                cursor.sweep_units_x,
                cursor.sweep_x[n - 1],
                cursor.sweep_units_x
            );
            let show = n.min(5);
            println!("    first values: {:?}", &cursor.sweep_y.to_vec()[..show]);
        }
    }

    match cfs.check() {
        Ok(()) => println!("\nRecording passes the conversion checks."),
        Err(e) => println!("\nRecording fails the conversion checks: {}", e),
    }

    // Settings stored next to the recording, if any
    let settings = Settings::discover(path)?;
    let stimset = protocol_name(&cfs.id);
    println!(
        "Scale factor for {}: {}",
        stimset,
        settings.scale_factor(&cfs.path, stimset)
    );

    Ok(())
}

//! Driver binary translating a stream of GRIB1 messages into GRIB2
//! (spec.md §6.3); mirror image of `grib2to1.rs`.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use gribconv::CodecSession;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"), version, about = "Translate GRIB1 messages to GRIB2")]
struct Args {
    /// Input file containing one or more concatenated GRIB1 messages.
    input: PathBuf,
    /// Output file to write the concatenated GRIB2 messages to.
    output: PathBuf,
}

fn real_main() -> anyhow::Result<()> {
    let args = Args::parse();

    let input = fs::read(&args.input)?;
    let mut session = CodecSession::new();
    let staged = session.input_buffer(input.len());
    staged.copy_from_slice(&input);
    let staged = staged.clone();

    let result = gribconv::run_grib1_to_2(&mut session, &staged)?;
    fs::write(&args.output, &result.output)?;

    for (offset, err) in &result.skipped {
        eprintln!("warning: message at offset {offset}: {err}");
    }

    println!(
        "Number of GRIB2 messages written to output: {}",
        result.items_written
    );

    Ok(())
}

fn main() {
    if let Err(ref e) = real_main() {
        let red = console::Style::new().red();
        eprintln!("{}: {e}", red.apply_to("error"));
        std::process::exit(1);
    }
}

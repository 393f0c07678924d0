//! Driver binary translating a stream of GRIB2 messages into GRIB1
//! (spec.md §6.3), grounded on the teacher's `cli/src/main.rs`
//! `app()`/`real_main()`/`main()` split and its `console`-styled error
//! reporting, adapted from clap's builder API to its derive API since
//! this binary has a single flat argument list rather than subcommands.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use gribconv::CodecSession;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"), version, about = "Translate GRIB2 messages to GRIB1")]
struct Args {
    /// Input file containing one or more concatenated GRIB2 messages.
    input: PathBuf,
    /// Output file to write the concatenated GRIB1 messages to.
    output: PathBuf,
}

fn real_main() -> anyhow::Result<()> {
    let args = Args::parse();

    let input = fs::read(&args.input)?;
    let mut session = CodecSession::new();
    let staged = session.input_buffer(input.len());
    staged.copy_from_slice(&input);
    let staged = staged.clone();

    let result = gribconv::run_grib2_to_1(&mut session, &staged)?;
    fs::write(&args.output, &result.output)?;

    for (offset, err) in &result.skipped {
        eprintln!("warning: message at offset {offset}: {err}");
    }

    println!(
        "Number of GRIB1 messages written to output: {}",
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

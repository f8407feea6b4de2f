//! Argus binary crate.

use std::io::{self, Write};
use std::path::Path;

use clap::Parser;
use fs_err as fs;

use argus::error::SynthesisError;
use argus::fsm::parser::{parse_fsm, parse_txt};
use argus::fsm::Fsm;
use argus::options::{CliOptions, Command, Mode, TraceLevel};
use argus::property::IsProperty;
use argus::{build_nbaic, reduce_mpo, synthesize_supervisor, writer, Status};

fn main() {
    if let Err(error) = argus_main() {
        // discard result as we cannot further propagate a write error
        let _ = writeln!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

/// Initialize the logging framework with the given trace level.
fn initialize_logging(level: TraceLevel) {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .init();
}

fn argus_main() -> Result<(), SynthesisError> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level);

    let plant = read_plant(&options.fsm_file)?;
    let isp = match &options.isp_file {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            IsProperty::parse(&text, &path.to_string_lossy(), &plant)?
        }
        None => IsProperty::Trivial,
    };

    if options.write_files {
        fs::create_dir_all(&options.output_dir)?;
    }

    match options.mode {
        Command::Bscopnbmax => run_bscopnbmax(&options, &plant, &isp),
        Command::Mpo => run_mpo(&options, &plant, &isp),
        Command::Convert => run_convert(&options, &plant),
    }
}

fn read_plant(path: &Path) -> Result<Fsm, SynthesisError> {
    let text = fs::read_to_string(path)?;
    let name = path.to_string_lossy();
    if path.extension().is_some_and(|e| e == "txt") {
        parse_txt(&text, &name)
    } else {
        parse_fsm(&text, &name)
    }
}

fn write_result_file<F>(options: &CliOptions, name: &str, write: F) -> Result<(), SynthesisError>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let mut file = fs::File::create(options.output_dir.join(name))?;
    write(&mut file)?;
    Ok(())
}

/// Basic supervisory control and observation problem, non-blocking and
/// maximally permissive case.
fn run_bscopnbmax(
    options: &CliOptions,
    plant: &Fsm,
    isp: &IsProperty,
) -> Result<(), SynthesisError> {
    let nbaic = build_nbaic(plant, isp, Mode::Bscopnbmax);
    if nbaic.is_empty() {
        writeln!(io::stdout(), "{}", Status::Infeasible)?;
        writeln!(io::stdout(), "unfolds 0")?;
        return Ok(());
    }
    let synthesis = synthesize_supervisor(&nbaic, plant)?;
    writeln!(io::stdout(), "{}", Status::Feasible)?;
    writeln!(io::stdout(), "unfolds {}", synthesis.num_unfolds())?;
    if options.write_files {
        write_result_file(options, "FSM.fsm", |f| writer::write_fsm(plant, f))?;
        write_result_file(options, "NBAIC.fsm", |f| writer::write_nbaic(&nbaic, plant, f))?;
        write_result_file(options, "UBTS.fsm", |f| {
            writer::write_ubts(synthesis.ubts(), &nbaic, plant, false, f)
        })?;
        write_result_file(options, "EBTS.fsm", |f| {
            writer::write_ubts(synthesis.ubts(), &nbaic, plant, true, f)
        })?;
        write_result_file(options, "ICS.fsm", |f| {
            writer::write_ics(synthesis.ics(), plant, f)
        })?;
        write_result_file(options, "A_UxG.fsm", |f| {
            writer::write_fsm(synthesis.product(), f)
        })?;
    } else {
        writer::write_fsm(synthesis.product(), io::stdout())?;
    }
    Ok(())
}

/// Most permissive observer.
fn run_mpo(options: &CliOptions, plant: &Fsm, isp: &IsProperty) -> Result<(), SynthesisError> {
    let nbaic = build_nbaic(plant, isp, Mode::Mpo);
    if nbaic.is_empty() {
        writeln!(io::stdout(), "{}", Status::Infeasible)?;
        writeln!(io::stdout(), "unfolds 0")?;
        return Ok(());
    }
    writeln!(io::stdout(), "{}", Status::Feasible)?;
    writeln!(io::stdout(), "unfolds 0")?;
    let reduced = reduce_mpo(nbaic.clone(), plant, options.condition);
    if options.write_files {
        write_result_file(options, "FSM.fsm", |f| writer::write_fsm(plant, f))?;
        write_result_file(options, "MPO.fsm", |f| writer::write_nbaic(&nbaic, plant, f))?;
        write_result_file(options, "BDO.fsm", |f| {
            writer::write_nbaic(&reduced, plant, f)
        })?;
    } else {
        writer::write_nbaic(&reduced, plant, io::stdout())?;
    }
    Ok(())
}

/// Finite state machine file conversion utility.
fn run_convert(options: &CliOptions, plant: &Fsm) -> Result<(), SynthesisError> {
    let to_txt = !options.fsm_file.extension().is_some_and(|e| e == "txt");
    if options.write_files {
        if to_txt {
            write_result_file(options, "FSM.txt", |f| writer::write_txt(plant, f))?;
        } else {
            write_result_file(options, "FSM.fsm", |f| writer::write_fsm(plant, f))?;
        }
    } else if to_txt {
        writer::write_txt(plant, io::stdout())?;
    } else {
        writer::write_fsm(plant, io::stdout())?;
    }
    Ok(())
}

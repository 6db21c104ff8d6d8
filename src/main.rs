//! Punto de entrada ("driver").
//!
//! Este módulo expone una CLI sobre [`pipeline::compile`]: lee el código
//! fuente, presenta los diagnósticos y escribe el código generado junto
//! con los listados que se soliciten.

use anyhow::{self, Context};
use clap::{self, crate_version, Arg, Command};
use tacc::pipeline::{self, Compilation, Dump};

use std::{
    fs::{File, OpenOptions},
    io::{self, BufReader, Write},
    process,
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("tacc")
        .version(crate_version!())
        .about("Compiles a source program to three-address code")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("tokens")
                .short('t')
                .long("tokens")
                .help("Dump the token stream"),
        )
        .arg(
            Arg::new("ast")
                .short('a')
                .long("ast")
                .help("Dump the syntax tree"),
        )
        .arg(
            Arg::new("symbols")
                .short('s')
                .long("symbols")
                .help("Dump the symbol table and scope listing"),
        )
        .arg(
            Arg::new("errors")
                .short('e')
                .long("errors")
                .takes_value(true)
                .value_name("FILE")
                .help("Also append diagnostics to this file"),
        )
        .get_matches();

    let input = args.value_of("input").context("Missing input file")?;
    let output = args.value_of("output").unwrap_or("-");

    let mut dump = Dump::empty();
    for (flag, set) in [("tokens", Dump::TOKENS), ("ast", Dump::TREE), ("symbols", Dump::SYMBOLS)] {
        if args.is_present(flag) {
            dump |= set;
        }
    }

    let compilation = match input {
        "-" => pipeline::compile(io::stdin().lock(), "<stdin>"),

        path => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            pipeline::compile(BufReader::new(file), path)
        }
    };

    if !dump.is_empty() {
        let stdout = io::stdout();
        compilation
            .dump(dump, &mut stdout.lock())
            .context("Failed to write listings")?;
    }

    if !compilation.diagnostics().is_empty() {
        report(&compilation, args.value_of("errors"))?;
        process::exit(1);
    }

    let tac = match compilation.tac() {
        Some(tac) => tac,
        None => process::exit(1),
    };

    match output {
        "-" => {
            let stdout = io::stdout();
            write!(stdout.lock(), "{}", tac).context("Failed to write to stdout")?;
        }

        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            write!(file, "{}", tac).with_context(|| format!("Failed to write to file: {}", path))?;
        }
    }

    Ok(())
}

/// Presenta los diagnósticos en stderr y, opcionalmente, en un archivo.
fn report(compilation: &Compilation, errors: Option<&str>) -> anyhow::Result<()> {
    let diagnostics = compilation.diagnostics();
    eprint!("{}", diagnostics);

    if let Some(path) = errors {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open for appending: {}", path))?;

        write!(file, "{}", diagnostics)
            .with_context(|| format!("Failed to write to file: {}", path))?;
    }

    Ok(())
}

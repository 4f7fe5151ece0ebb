// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{anyhow, Context, Result},
    ar_archive::{ArReader, Seekable},
    clap::{Arg, ArgMatches, Command},
    deb_reader::{deb::DebReader, io::TextEncoding},
    log::LevelFilter,
    std::{fs::File, io::BufReader, str::FromStr},
};

const ABOUT: &str = "\
# About

`deb-tool` inspects Debian binary package (`.deb`) files.

Packages are read in a single pass without extracting anything to disk.
Compressed `control.tar` and `data.tar` members using gzip, xz or bzip2
are supported.
";

type PackageReader = DebReader<Seekable<BufReader<File>>>;

fn path_arg() -> Arg<'static> {
    Arg::new("path")
        .required(true)
        .help("Path to .deb file to examine")
}

pub fn run() -> Result<()> {
    let app = Command::new("deb-tool")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Inspect Debian .deb package files")
        .long_about(ABOUT)
        .arg_required_else_help(true);

    let app = app.arg(
        Arg::new("verbose")
            .long("verbose")
            .short('v')
            .global(true)
            .multiple_occurrences(true)
            .help("Increase logging verbosity. Can be specified multiple times."),
    );

    let app = app.arg(
        Arg::new("encoding")
            .long("encoding")
            .takes_value(true)
            .default_value("ascii")
            .global(true)
            .help("Text encoding of the control file (ascii, utf-8 or latin1)"),
    );

    let app = app.arg(
        Arg::new("buffered")
            .long("buffered")
            .global(true)
            .help("Copy each archive member into memory before processing it"),
    );

    let app = app.subcommand(
        Command::new("members")
            .about("Print the ar archive members of a package")
            .arg(path_arg()),
    );

    let app = app.subcommand(
        Command::new("control")
            .about("Print the fields of the control file")
            .arg(path_arg()),
    );

    let app = app.subcommand(
        Command::new("files")
            .about("Print the files installed by a package")
            .arg(path_arg()),
    );

    let app = app.subcommand(
        Command::new("info")
            .about("Print a summary of a package")
            .arg(path_arg()),
    );

    let matches = app.get_matches();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(log_level(matches.occurrences_of("verbose")).as_str()),
    )
    .format_timestamp(None)
    .init();

    match matches.subcommand() {
        Some(("members", args)) => command_members(args),
        Some(("control", args)) => command_control(args),
        Some(("files", args)) => command_files(args),
        Some(("info", args)) => command_info(args),
        _ => Err(anyhow!("invalid sub-command")),
    }
}

fn log_level(occurrences: u64) -> LevelFilter {
    match occurrences {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn open_file(args: &ArgMatches) -> Result<BufReader<File>> {
    let path = args
        .value_of("path")
        .ok_or_else(|| anyhow!("path argument is required"))?;

    let fh = File::open(path).with_context(|| format!("opening {}", path))?;

    Ok(BufReader::new(fh))
}

fn open_package(args: &ArgMatches) -> Result<PackageReader> {
    let encoding = args.value_of("encoding").unwrap_or("ascii");
    let encoding = TextEncoding::from_str(encoding)
        .map_err(|_| anyhow!("unknown encoding: {}", encoding))?;

    Ok(DebReader::new_seekable(open_file(args)?)
        .context("reading ar archive")?
        .with_encoding(encoding)
        .buffered(args.is_present("buffered")))
}

/// Render a control field the way it appears in a control file.
fn format_field(name: &str, value: &str) -> String {
    format!("{}: {}", name, value.replace('\n', "\n "))
}

fn command_members(args: &ArgMatches) -> Result<()> {
    let mut archive = ArReader::new_seekable(open_file(args)?)?;

    while let Some(entry) = archive.next_entry() {
        let entry = entry?;
        let header = entry.header();

        println!(
            "{}\t{}\t{}\t{}",
            header.name,
            header.size,
            header.mode,
            header
                .modified_time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| header.mtime.to_string())
        );

        entry.finish()?;
    }

    Ok(())
}

fn command_control(args: &ArgMatches) -> Result<()> {
    let control = open_package(args)?.read_control()?;

    for (name, value) in control.iter_fields() {
        println!("{}", format_field(name, value));
    }

    Ok(())
}

fn command_files(args: &ArgMatches) -> Result<()> {
    for path in open_package(args)?.read_files()? {
        println!("{}", path);
    }

    Ok(())
}

fn command_info(args: &ArgMatches) -> Result<()> {
    let res = open_package(args)?.read_all()?;

    let control = res
        .control
        .ok_or_else(|| anyhow!("package has no control file"))?;
    let files = res.files.unwrap_or_default();

    println!("Package: {}", control.package().unwrap_or("<unknown>"));
    println!("Version: {}", control.version().unwrap_or("<unknown>"));
    println!(
        "Architecture: {}",
        control.architecture().unwrap_or("<unknown>")
    );
    println!("Files: {}", files.len());

    Ok(())
}

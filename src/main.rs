// main.rs      gifreel command
//
// Copyright (c) 2019-2025  Douglas Lau
//
#![forbid(unsafe_code)]

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gifreel::Encoder;
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::str::FromStr;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &'static str = std::env!("CARGO_PKG_VERSION");

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    let res = match create_app().get_matches().subcommand() {
        ("wrap", Some(matches)) => wrap(&mut out, matches),
        _ => unreachable!(),
    };
    if let Err(e) = res {
        let mut red = ColorSpec::new();
        red.set_fg(Some(Color::Red)).set_intense(true);
        out.set_color(&red)?;
        writeln!(out, "error: {}", e)?;
        out.reset()?;
        std::process::exit(1);
    }
    out.reset()?;
    Ok(())
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("gifreel")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("Animated GIF encoder")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("wrap")
                .about("Wrap raw RGBA frames into an animated GIF")
                .arg(
                    Arg::with_name("width")
                        .long("width")
                        .takes_value(true)
                        .required(true)
                        .help("frame width"),
                )
                .arg(
                    Arg::with_name("height")
                        .long("height")
                        .takes_value(true)
                        .required(true)
                        .help("frame height"),
                )
                .arg(
                    Arg::with_name("delay")
                        .long("delay")
                        .takes_value(true)
                        .default_value("100")
                        .help("delay between frames (ms)"),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .required(true)
                        .help("output GIF file"),
                )
                .arg(
                    Arg::with_name("files")
                        .required(true)
                        .min_values(1)
                        .help("input file(s) of raw RGBA frames"),
                ),
        )
}

/// Parse a numeric argument
fn parse_arg<T: FromStr>(
    matches: &ArgMatches,
    name: &str,
) -> Result<T, Box<dyn Error>> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .map_err(|_| format!("invalid {}: {:?}", name, value).into())
}

/// Handle wrap subcommand
fn wrap(
    out: &mut StandardStream,
    matches: &ArgMatches,
) -> Result<(), Box<dyn Error>> {
    let width: u16 = parse_arg(matches, "width")?;
    let height: u16 = parse_arg(matches, "height")?;
    let delay: u32 = parse_arg(matches, "delay")?;
    let frame_sz = usize::from(width) * usize::from(height) * 4;
    let mut enc = Encoder::new(width, height)?.with_delay_ms(delay);
    let mut buffers = vec![];
    if let Some(values) = matches.values_of_os("files") {
        for path in values {
            buffers.push(read_frames(path, frame_sz)?);
        }
    }
    for buf in &buffers {
        for frame in buf.chunks_exact(frame_sz) {
            enc.add_frame(frame)?;
        }
    }
    enc.finish()?;
    let gif = enc.into_output();
    if let Some(path) = matches.value_of_os("output") {
        fs::write(path, &gif)?;
        let mut magenta = ColorSpec::new();
        magenta.set_fg(Some(Color::Magenta));
        let mut bold = ColorSpec::new();
        bold.set_fg(Some(Color::White))
            .set_intense(true)
            .set_bold(true);
        out.set_color(&magenta)?;
        writeln!(out, "{:?}", path)?;
        out.set_color(&bold)?;
        let n_frames = buffers.iter().map(|b| b.len() / frame_sz).sum::<usize>();
        writeln!(out, "frames: {}, bytes: {}", n_frames, gif.len())?;
    }
    Ok(())
}

/// Read a file of raw RGBA frames
fn read_frames(path: &OsStr, frame_sz: usize) -> Result<Vec<u8>, Box<dyn Error>> {
    let buf = fs::read(path)?;
    if buf.is_empty() || buf.len() % frame_sz != 0 {
        return Err(format!(
            "{:?}: {} bytes is not a whole number of {} byte frames",
            path,
            buf.len(),
            frame_sz
        )
        .into());
    }
    Ok(buf)
}

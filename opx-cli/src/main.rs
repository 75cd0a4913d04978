use clap::Parser;
use cli::{ConvertArgs, ExtractArgs, FilterArgs, OpxArgs, OpxCommand, RestripeArgs};
use log::LevelFilter;
use opx_core::codec::mxf;
use opx_core::error::OpxError;
use opx_core::model::{FormatTag, ParseOptions};
use opx_core::registry::{self, HandlerKind};
use opx_core::timecode::Timecode;
use opx_core::FormatIo;
use std::fs::File;

mod cli;
mod utils;

fn parse_timecode(text: &str) -> anyhow::Result<Timecode> {
    let drop_frame = text.contains(';');
    let parts: Vec<&str> = text.split([':', ';']).collect();
    if parts.len() != 4 {
        anyhow::bail!("timecode must be HH:MM:SS:FF (or ;FF for drop-frame), got {text:?}");
    }
    let h: u8 = parts[0].parse()?;
    let m: u8 = parts[1].parse()?;
    let s: u8 = parts[2].parse()?;
    let f: u32 = parts[3].parse()?;
    let timebase = if drop_frame { 30 } else { 25 };
    Ok(Timecode::new(h, m, s, f, timebase, drop_frame)?)
}

fn run_filter(args: FilterArgs) -> anyhow::Result<()> {
    let mut io = FormatIo::open(&args.input)?;
    let mut options = ParseOptions::default();
    if let Some(mag) = args.magazine {
        options = options.with_magazine(mag);
    }
    if let Some(rows) = args.rows {
        options = options.with_rows(rows);
    }
    if let Some(pids) = args.pids {
        options = options.with_pids(pids);
    }
    io = io.with_options(options);

    let format = FormatTag::from_extension(
        args.input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(""),
    )
    .unwrap_or(FormatTag::Unknown);

    match registry::handler_kind(format) {
        HandlerKind::Lines => {
            for line in io.parse_lines()? {
                println!(
                    "{} mag={:?} row={:?} {}",
                    line.timecode,
                    line.magazine,
                    line.row,
                    line.text.unwrap_or_default()
                );
            }
        }
        HandlerKind::Packets => {
            for packet in io.parse_packets()? {
                println!("{} lines={}", packet.timecode, packet.line_count());
                for line in &packet.lines {
                    println!(
                        "  mag={:?} row={:?} {}",
                        line.magazine,
                        line.row,
                        line.text.clone().unwrap_or_default()
                    );
                }
            }
        }
        HandlerKind::Export => anyhow::bail!("{format:?} is an export-only format, not a filter source"),
    }

    Ok(())
}

fn run_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let target = FormatTag::from_extension(
        args.output
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow::anyhow!("output path has no extension"))?,
    )
    .ok_or_else(|| anyhow::anyhow!("unrecognised output extension"))?;

    let mut options = ParseOptions::default();
    if let Some(mag) = args.magazine {
        options = options.with_magazine(mag);
    }
    if let Some(rows) = args.rows {
        options = options.with_rows(rows);
    }

    let io = FormatIo::open(&args.input)?
        .with_options(options)
        .convert_to(target)?
        .with_stl_merge(args.stl_merge);
    let mut io = io;
    let lines = io.parse_lines()?;

    let mut out = File::create(&args.output)?;
    io.save_to(&mut out, &lines)?;
    Ok(())
}

fn run_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let mut file = File::open(&args.input)?;
    let mut options = mxf::ExtractOptions {
        function: if args.demux { mxf::Function::Demux } else { mxf::Function::Extract },
        use_names: args.names,
        klv: args.klv,
        base_path: args.output,
        ..Default::default()
    };

    if let Some(chars) = args.key_types {
        for c in chars {
            let selector = match c {
                'd' => mxf::KeyTypeSelector::Data,
                'v' => mxf::KeyTypeSelector::Video,
                's' => mxf::KeyTypeSelector::System,
                't' => mxf::KeyTypeSelector::TimecodeComponent,
                'a' => mxf::KeyTypeSelector::Audio,
                other => anyhow::bail!("unknown key type selector {other:?}"),
            };
            options.key_types.insert(selector);
        }
    }

    let units = if args.demux {
        mxf::demux_units(&mut file, &options)?
    } else {
        mxf::extract_units(&mut file, &options)?
    };

    for unit in units {
        std::fs::write(&unit.path, &unit.unit.value)?;
        log::info!("wrote {} ({:?})", unit.path.display(), unit.key_type);
    }
    Ok(())
}

fn run_restripe(args: RestripeArgs) -> anyhow::Result<()> {
    let new_start = parse_timecode(&args.start)?;
    let mut file = std::fs::OpenOptions::new().read(true).write(true).open(&args.input)?;
    mxf::restripe::restripe(&mut file, new_start)?;
    Ok(())
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(OpxError::Cancelled) = err.downcast_ref::<OpxError>() {
        130
    } else {
        1
    }
}

fn main() {
    let args = OpxArgs::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder()
        .filter_level(level)
        .format(utils::log::formatter)
        .init();

    let result = match args.command {
        OpxCommand::Filter(a) => run_filter(a),
        OpxCommand::Convert(a) => run_convert(a),
        OpxCommand::Extract(a) => run_extract(a),
        OpxCommand::Restripe(a) => run_restripe(a),
    };

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(exit_code_for(&err));
    }
}


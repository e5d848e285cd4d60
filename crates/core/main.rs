/*!
The main entry point into binfind.
*/

use std::{io::IsTerminal, process::ExitCode};

use termcolor::{ColorChoice, StandardStream};

use {
    binfind_matcher::build_scanner,
    binfind_pattern::PatternCompilerBuilder,
    binfind_printer::{
        ColorSpecs, MatchRender, StandardBuilder, SummaryBuilder, SummaryKind,
    },
    binfind_searcher::StreamScannerBuilder,
};

use crate::{
    flags::{Args, ParseResult},
    search::{Printer, SearchWorkerBuilder},
};

#[macro_use]
mod messages;

mod flags;
mod logger;
#[cfg(target_os = "linux")]
mod memory;
mod search;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Look for a broken pipe error. In this case, we generally
            // want to exit "gracefully" with a success exit code. This
            // matches existing Unix convention. We need to handle this
            // explicitly since the Rust runtime doesn't ask for PIPE
            // signals, and so we get an I/O error instead.
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            eprintln_locked!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// The main entry point for binfind.
///
/// The exit code follows the grep convention: 0 when a match was found,
/// 1 when no match was found and 2 when an error occurred. Per-origin IO
/// errors do not abort the run but do force the exit code to 2.
fn run() -> anyhow::Result<ExitCode> {
    messages::set_messages(true);
    if let Err(err) = logger::Logger::init() {
        anyhow::bail!("failed to initialize logger: {err}");
    }
    log::set_max_level(log::LevelFilter::Warn);

    let args = match flags::parse(std::env::args_os().skip(1))? {
        ParseResult::Help => {
            flags::print_usage(std::io::stdout())?;
            return Ok(ExitCode::SUCCESS);
        }
        ParseResult::Version => {
            flags::print_version(std::io::stdout())?;
            return Ok(ExitCode::SUCCESS);
        }
        ParseResult::Run(args) => args,
    };

    if args.verbose > 1 {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let mut worker = build_worker(&args)?;
    #[cfg(target_os = "linux")]
    if let Some(pid) = args.pid {
        memory::search_process(
            &mut worker,
            pid,
            args.mem_offset,
            args.mem_size,
        )?;
        return Ok(exit_code(worker.matched()));
    }
    #[cfg(not(target_os = "linux"))]
    if args.pid.is_some() {
        anyhow::bail!("process memory scanning is only supported on Linux");
    }

    for path in args.paths.iter() {
        worker.search_arg(path);
    }
    Ok(exit_code(worker.matched()))
}

fn exit_code(matched: bool) -> ExitCode {
    if messages::errored() {
        ExitCode::from(2)
    } else if matched {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}

/// Compile the pattern, pick the backend and printer and tie them into a
/// search worker.
fn build_worker(
    args: &Args,
) -> anyhow::Result<search::SearchWorker<StandardStream>> {
    let mut compiler = PatternCompilerBuilder::new();
    compiler
        .hex(args.hex)
        .guid(args.guid)
        .binary(args.binary)
        .word(args.word)
        .representation(args.backend.representation());
    let set = compiler.build().compile(&args.pattern)?;
    if args.verbose > 1 {
        if let Some(regex) = set.regex() {
            log::debug!("compiled regex: {}", regex);
        }
        for bm in set.masks() {
            log::debug!("compiled bytes: {:02x?}", bm.data);
            log::debug!("compiled  mask: {:02x?}", bm.mask);
        }
    }
    let backend = build_scanner(args.backend, &set, !args.case_sensitive)?;

    let scanner = StreamScannerBuilder::new()
        .follow(args.follow)
        .match_start_only(args.match_start_only)
        .force_sequential(args.force_sequential)
        .build();

    let (stdout, colors) = if std::io::stdout().is_terminal() {
        (
            StandardStream::stdout(ColorChoice::Auto),
            ColorSpecs::default_with_color(),
        )
    } else {
        (StandardStream::stdout(ColorChoice::Never), ColorSpecs::new())
    };
    let printer = if args.list {
        Printer::Summary(
            SummaryBuilder::new()
                .kind(SummaryKind::List)
                .color_specs(colors)
                .build(stdout),
        )
    } else if args.count {
        Printer::Summary(
            SummaryBuilder::new()
                .kind(SummaryKind::Count)
                .color_specs(colors)
                .build(stdout),
        )
    } else {
        let render = if args.verbose == 0 {
            None
        } else if args.guid {
            Some(MatchRender::Guid)
        } else if args.binary {
            Some(MatchRender::Hex)
        } else {
            Some(MatchRender::Ascii)
        };
        Printer::Standard(
            StandardBuilder::new()
                .render(render)
                .color_specs(colors)
                .build(stdout),
        )
    };

    Ok(SearchWorkerBuilder::new()
        .max_size(args.max_size)
        .recurse(args.recurse)
        .build(scanner, backend, printer))
}

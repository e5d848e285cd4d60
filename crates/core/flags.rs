/*!
CLI argument parsing for binfind, built on `lexopt`.

The surface is deliberately small: single-letter flags in the tradition
of the classic hex search tools, one pattern, then zero or more paths.
*/

use std::{ffi::OsString, path::PathBuf};

use anyhow::Context;

use binfind_matcher::ScannerKind;

const USAGE: &str = "\
Search files, directory trees, stdin or process memory for text, regex,
hex byte/nyble masks or GUIDs.

USAGE:
    binfind [OPTIONS] PATTERN [PATH ...]

When no PATH is given, standard input is searched. Hex patterns imply a
binary, case sensitive match.

OPTIONS:
    -w            match whole words (regex backend)
    -b            binary match (no unicode widening)
    -I            case sensitive match
    -x            pattern is in hex
    -g            pattern is a GUID
    -v            verbose output; twice to also dump the compiled pattern
    -r            recurse into directories
    -0            only match at the start of each origin
    -l            list matching origins only
    -c            count matches per origin
    -f            follow, keep checking the origin for new data
    -M NUM        skip origins larger than NUM bytes
    -S NAME       scan backend: regex, memmem, aho, horspool, mask
    -Q            read sequentially instead of memory mapping
    -p PID        search the memory of the given process (Linux only)
    -o OFS        memory offset to start searching
    -L SIZE       size of the memory block to search
    -h, --help    print this help
    -V, --version print the version
";

/// The result of parsing the CLI arguments.
#[derive(Debug)]
pub(crate) enum ParseResult {
    /// Print the usage text and exit with success.
    Help,
    /// Print the version and exit with success.
    Version,
    /// Run a search with the given arguments.
    Run(Args),
}

/// Everything binfind needs to know, as given on the command line.
#[derive(Debug)]
pub(crate) struct Args {
    pub(crate) pattern: String,
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) word: bool,
    pub(crate) binary: bool,
    pub(crate) case_sensitive: bool,
    pub(crate) hex: bool,
    pub(crate) guid: bool,
    /// The number of times `-v` was given.
    pub(crate) verbose: usize,
    pub(crate) recurse: bool,
    pub(crate) match_start_only: bool,
    pub(crate) list: bool,
    pub(crate) count: bool,
    pub(crate) follow: bool,
    pub(crate) max_size: Option<u64>,
    pub(crate) backend: ScannerKind,
    pub(crate) force_sequential: bool,
    pub(crate) pid: Option<i32>,
    pub(crate) mem_offset: u64,
    pub(crate) mem_size: u64,
}

impl Default for Args {
    fn default() -> Args {
        Args {
            pattern: String::new(),
            paths: vec![],
            word: false,
            binary: false,
            case_sensitive: false,
            hex: false,
            guid: false,
            verbose: 0,
            recurse: false,
            match_start_only: false,
            list: false,
            count: false,
            follow: false,
            max_size: None,
            backend: ScannerKind::Regex,
            force_sequential: false,
            pid: None,
            mem_offset: 0,
            // one page, like the classic default
            mem_size: 0x1000,
        }
    }
}

/// Print the usage text to the given writer.
pub(crate) fn print_usage(mut wtr: impl std::io::Write) -> std::io::Result<()> {
    write!(wtr, "{}", USAGE)
}

/// Print the version string to the given writer.
pub(crate) fn print_version(
    mut wtr: impl std::io::Write,
) -> std::io::Result<()> {
    writeln!(wtr, "binfind {}", env!("CARGO_PKG_VERSION"))
}

/// Parse the given CLI arguments, excluding the binary name.
pub(crate) fn parse<I>(raw: I) -> anyhow::Result<ParseResult>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::Arg;

    let mut args = Args::default();
    let mut positional: Vec<OsString> = vec![];
    let mut parser = lexopt::Parser::from_args(raw);
    while let Some(arg) = parser.next()? {
        match arg {
            Arg::Short('w') => args.word = true,
            Arg::Short('b') => args.binary = true,
            Arg::Short('I') => args.case_sensitive = true,
            Arg::Short('x') => args.hex = true,
            Arg::Short('g') => args.guid = true,
            Arg::Short('v') => args.verbose += 1,
            Arg::Short('r') => args.recurse = true,
            Arg::Short('0') => args.match_start_only = true,
            Arg::Short('l') => args.list = true,
            Arg::Short('c') => args.count = true,
            Arg::Short('f') => args.follow = true,
            Arg::Short('Q') => args.force_sequential = true,
            Arg::Short('M') => {
                args.max_size = Some(parse_number(parser.value()?)?);
            }
            Arg::Short('S') => {
                let name = parser.value()?.into_string().map_err(|_| {
                    anyhow::anyhow!("backend name is not valid UTF-8")
                })?;
                args.backend = match ScannerKind::from_name(&name) {
                    Some(kind) => kind,
                    None => {
                        message!(
                            "unknown backend '{}' (expected one of: \
                             regex, memmem, aho, horspool, mask), \
                             using 'regex'",
                            name
                        );
                        ScannerKind::Regex
                    }
                };
            }
            Arg::Short('p') => {
                let pid = parse_number(parser.value()?)?;
                args.pid = Some(i32::try_from(pid).context("invalid pid")?);
            }
            Arg::Short('o') => {
                args.mem_offset = parse_number(parser.value()?)?;
            }
            Arg::Short('L') => {
                args.mem_size = parse_number(parser.value()?)?;
            }
            Arg::Short('h') | Arg::Long("help") => {
                return Ok(ParseResult::Help);
            }
            Arg::Short('V') | Arg::Long("version") => {
                return Ok(ParseResult::Version);
            }
            Arg::Value(v) => positional.push(v),
            arg => return Err(arg.unexpected().into()),
        }
    }

    let mut positional = positional.into_iter();
    args.pattern = match positional.next() {
        Some(p) => p
            .into_string()
            .map_err(|_| anyhow::anyhow!("pattern is not valid UTF-8"))?,
        None => anyhow::bail!("no pattern given\n\n{}", USAGE),
    };
    args.paths = positional.map(PathBuf::from).collect();
    // a hex pattern denotes exact bytes, so text-oriented defaults are off
    if args.hex {
        args.binary = true;
        args.case_sensitive = true;
    }
    if args.paths.is_empty() && args.pid.is_none() {
        args.paths.push(PathBuf::from("-"));
    }
    Ok(ParseResult::Run(args))
}

/// Parse a decimal or `0x` prefixed hex number.
fn parse_number(v: OsString) -> anyhow::Result<u64> {
    let s = v
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("number is not valid UTF-8"))?;
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("invalid number '{}'", s))
}

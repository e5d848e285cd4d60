use std::io::{self, Write};

use termcolor::{NoColor, WriteColor};

use {
    binfind_matcher::ScanFlow,
    binfind_searcher::{MatchSpan, ScanStats, Sink},
};

use crate::color::ColorSpecs;

/// The type of aggregate output to print.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SummaryKind {
    /// Print a count of all matches, preceded by the origin name.
    ///
    /// Origins with no matches are omitted.
    Count,
    /// Print the origin name if and only if it matched at all.
    ///
    /// Since the count is irrelevant, the scan of an origin stops at its
    /// first match.
    List,
}

/// The configuration for the summary printer.
#[derive(Clone, Debug)]
struct Config {
    kind: SummaryKind,
    colors: ColorSpecs,
}

impl Default for Config {
    fn default() -> Config {
        Config { kind: SummaryKind::Count, colors: ColorSpecs::default() }
    }
}

/// A builder for the summary printer.
#[derive(Clone, Debug, Default)]
pub struct SummaryBuilder {
    config: Config,
}

impl SummaryBuilder {
    /// Return a new builder for configuring the summary printer.
    pub fn new() -> SummaryBuilder {
        SummaryBuilder { config: Config::default() }
    }

    /// Build a printer that writes results to the given writer.
    pub fn build<W: WriteColor>(&self, wtr: W) -> Summary<W> {
        Summary { config: self.config.clone(), wtr, matches: 0 }
    }

    /// Build a printer that writes results to the given writer with no
    /// color support.
    pub fn build_no_color<W: io::Write>(&self, wtr: W) -> Summary<NoColor<W>> {
        self.build(NoColor::new(wtr))
    }

    /// Set the kind of aggregate output.
    pub fn kind(&mut self, kind: SummaryKind) -> &mut SummaryBuilder {
        self.config.kind = kind;
        self
    }

    /// Set the color specs used for origin names.
    pub fn color_specs(&mut self, specs: ColorSpecs) -> &mut SummaryBuilder {
        self.config.colors = specs;
        self
    }
}

/// The summary printer: one line per matching origin, carrying either a
/// match count or nothing but the origin name.
#[derive(Clone, Debug)]
pub struct Summary<W> {
    config: Config,
    wtr: W,
    matches: u64,
}

impl<W: WriteColor> Summary<W> {
    /// Returns true if this printer has seen at least one match since the
    /// last call to `begin`.
    pub fn has_match(&self) -> bool {
        self.matches > 0
    }

    /// Return a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Consume this printer and return back ownership of the writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }

    fn write_origin(&mut self, origin: &str) -> io::Result<()> {
        self.wtr.set_color(self.config.colors.origin())?;
        self.wtr.write_all(origin.as_bytes())?;
        self.wtr.reset()
    }
}

impl<W: WriteColor> Sink for Summary<W> {
    fn begin(&mut self, _origin: &str) -> io::Result<()> {
        self.matches = 0;
        Ok(())
    }

    fn matched(
        &mut self,
        origin: &str,
        _mat: &MatchSpan<'_>,
    ) -> io::Result<ScanFlow> {
        self.matches += 1;
        match self.config.kind {
            SummaryKind::Count => Ok(ScanFlow::Continue),
            SummaryKind::List => {
                self.write_origin(origin)?;
                self.wtr.write_all(b"\n")?;
                Ok(ScanFlow::Stop)
            }
        }
    }

    fn finish(&mut self, origin: &str, stats: &ScanStats) -> io::Result<()> {
        if self.config.kind == SummaryKind::Count && stats.has_match() {
            write!(self.wtr, "{:6} ", stats.matches())?;
            self.write_origin(origin)?;
            self.wtr.write_all(b"\n")?;
        }
        Ok(())
    }
}

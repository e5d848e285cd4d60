use std::io::{self, Write};

use termcolor::{NoColor, WriteColor};

use {
    binfind_matcher::ScanFlow,
    binfind_searcher::{MatchSpan, ScanStats, Sink},
};

use crate::{
    color::ColorSpecs,
    util::{ascii_dump, guid_string, hex_dump},
};

/// How the verbose layout renders the matched bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchRender {
    /// A space separated hex dump.
    Hex,
    /// A text dump with non-printable bytes replaced by dots.
    Ascii,
    /// The conventional GUID text form, falling back to a hex dump for
    /// matches that are not 16 bytes.
    Guid,
}

/// The configuration for the standard printer.
///
/// This is manipulated by a StandardBuilder and then referenced by the
/// actual implementation. Once a printer is built, the configuration is
/// frozen and cannot be changed.
#[derive(Clone, Debug)]
struct Config {
    colors: ColorSpecs,
    render: Option<MatchRender>,
}

impl Default for Config {
    fn default() -> Config {
        Config { colors: ColorSpecs::default(), render: None }
    }
}

/// A builder for the standard printer.
#[derive(Clone, Debug, Default)]
pub struct StandardBuilder {
    config: Config,
}

impl StandardBuilder {
    /// Return a new builder for configuring the standard printer.
    pub fn new() -> StandardBuilder {
        StandardBuilder { config: Config::default() }
    }

    /// Build a printer that writes results to the given writer.
    pub fn build<W: WriteColor>(&self, wtr: W) -> Standard<W> {
        Standard {
            config: self.config.clone(),
            wtr,
            printed_origin: false,
            matches: 0,
        }
    }

    /// Build a printer that writes results to the given writer with no
    /// color support.
    pub fn build_no_color<W: io::Write>(&self, wtr: W) -> Standard<NoColor<W>> {
        self.build(NoColor::new(wtr))
    }

    /// Set the color specs used for origins and offsets.
    pub fn color_specs(&mut self, specs: ColorSpecs) -> &mut StandardBuilder {
        self.config.colors = specs;
        self
    }

    /// Switch to the verbose layout: one line per match carrying the
    /// given rendering of the matched bytes. The default (`None`) is the
    /// compact layout of one offset list per origin.
    pub fn render(
        &mut self,
        render: Option<MatchRender>,
    ) -> &mut StandardBuilder {
        self.config.render = render;
        self
    }
}

/// The standard printer.
///
/// In its default layout, an origin that matches is printed once, on its
/// own line, followed by a single tab-indented line listing every match
/// offset in hex:
///
/// ```text
/// firmware.bin
///     000013fe, 00014202
/// ```
///
/// In the verbose layout each match gets its own line with the origin,
/// the offset and a rendering of the matched bytes. Origins with no
/// matches produce no output in either layout.
#[derive(Clone, Debug)]
pub struct Standard<W> {
    config: Config,
    wtr: W,
    printed_origin: bool,
    matches: u64,
}

impl<W: io::Write> Standard<NoColor<W>> {
    /// Create a printer with a default configuration and no color
    /// support, writing to the given writer.
    pub fn new_no_color(wtr: W) -> Standard<NoColor<W>> {
        StandardBuilder::new().build_no_color(wtr)
    }
}

impl<W: WriteColor> Standard<W> {
    /// Create a printer with a default configuration, writing to the
    /// given writer.
    pub fn new(wtr: W) -> Standard<W> {
        StandardBuilder::new().build(wtr)
    }

    /// Returns true if this printer has written at least one match since
    /// the last call to `begin`.
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

    fn write_offset(&mut self, offset: u64) -> io::Result<()> {
        self.wtr.set_color(self.config.colors.offset())?;
        write!(self.wtr, "{:08x}", offset)?;
        self.wtr.reset()
    }
}

impl<W: WriteColor> Sink for Standard<W> {
    fn begin(&mut self, _origin: &str) -> io::Result<()> {
        self.printed_origin = false;
        self.matches = 0;
        Ok(())
    }

    fn matched(
        &mut self,
        origin: &str,
        mat: &MatchSpan<'_>,
    ) -> io::Result<ScanFlow> {
        self.matches += 1;
        match self.config.render {
            None => {
                if !self.printed_origin {
                    self.write_origin(origin)?;
                    self.wtr.write_all(b"\n\t")?;
                    self.printed_origin = true;
                } else {
                    self.wtr.write_all(b", ")?;
                }
                self.write_offset(mat.start())?;
            }
            Some(render) => {
                self.write_origin(origin)?;
                self.wtr.write_all(b" ")?;
                self.write_offset(mat.start())?;
                let rendered = match render {
                    MatchRender::Hex => hex_dump(mat.bytes()),
                    MatchRender::Ascii => ascii_dump(mat.bytes()),
                    MatchRender::Guid => guid_string(mat.bytes())
                        .unwrap_or_else(|| hex_dump(mat.bytes())),
                };
                writeln!(self.wtr, " {}", rendered)?;
            }
        }
        Ok(ScanFlow::Continue)
    }

    fn finish(&mut self, _origin: &str, _stats: &ScanStats) -> io::Result<()> {
        if self.config.render.is_none() && self.printed_origin {
            self.wtr.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use binfind_matcher::RegexScanner;
    use binfind_searcher::StreamScanner;

    fn printer_contents(printer: Standard<NoColor<Vec<u8>>>) -> String {
        String::from_utf8(printer.into_inner().into_inner()).unwrap()
    }

    fn scan(
        pattern: &str,
        hay: &[u8],
        printer: &mut Standard<NoColor<Vec<u8>>>,
    ) {
        let backend = RegexScanner::new(pattern, false).unwrap();
        StreamScanner::new()
            .search_slice(&backend, "input.bin", hay, printer)
            .unwrap();
    }

    #[test]
    fn offset_list() {
        let mut printer = Standard::new_no_color(vec![]);
        scan("ab", b"ab..ab", &mut printer);
        assert!(printer.has_match());
        assert_eq!(
            printer_contents(printer),
            "input.bin\n\t00000000, 00000004\n"
        );
    }

    #[test]
    fn no_output_without_match() {
        let mut printer = Standard::new_no_color(vec![]);
        scan("zz", b"ab..ab", &mut printer);
        assert!(!printer.has_match());
        assert_eq!(printer_contents(printer), "");
    }

    #[test]
    fn verbose_hex() {
        let mut printer = StandardBuilder::new()
            .render(Some(MatchRender::Hex))
            .build_no_color(vec![]);
        scan("ab", b"ab..ab", &mut printer);
        assert_eq!(
            printer_contents(printer),
            "input.bin 00000000 61 62\ninput.bin 00000004 61 62\n"
        );
    }

    #[test]
    fn verbose_ascii() {
        let mut printer = StandardBuilder::new()
            .render(Some(MatchRender::Ascii))
            .build_no_color(vec![]);
        scan("a.b", b"xa\x01bx", &mut printer);
        assert_eq!(printer_contents(printer), "input.bin 00000001 a.b\n");
    }

    #[test]
    fn verbose_guid() {
        let mut printer = StandardBuilder::new()
            .render(Some(MatchRender::Guid))
            .build_no_color(vec![]);
        let hay = b"\x78\x56\x34\x12\x34\x12\x78\x56\
                    \x9a\xbc\xde\xf0\x12\x34\x56\x78";
        scan(r"\x78\x56\x34\x12.{12}", hay, &mut printer);
        assert_eq!(
            printer_contents(printer),
            "input.bin 00000000 {12345678-1234-5678-9abc-def012345678}\n"
        );
    }

    #[test]
    fn state_resets_between_origins() {
        let backend = RegexScanner::new("ab", false).unwrap();
        let mut printer = Standard::new_no_color(vec![]);
        let scanner = StreamScanner::new();
        scanner
            .search_slice(&backend, "one.bin", b"xab", &mut printer)
            .unwrap();
        scanner
            .search_slice(&backend, "two.bin", b"ab", &mut printer)
            .unwrap();
        assert_eq!(
            printer_contents(printer),
            "one.bin\n\t00000001\ntwo.bin\n\t00000000\n"
        );
    }
}

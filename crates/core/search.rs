/*!
Defines a very high level "search worker" abstraction.

A search worker manages the high level interaction points between the
scan backend (i.e., how bytes are matched), the stream scanner (i.e.,
how bytes are actually read and carried across refills) and the printer.
It is also where per-origin policy lives: the oversize skip, the walk
over directory trees and the per-origin error handling that keeps one
unreadable file from killing a recursive run.
*/

use std::{io, path::Path};

use termcolor::WriteColor;

use {
    binfind_matcher::PatternScanner,
    binfind_printer::{Standard, Summary},
    binfind_searcher::{ScanStats, StreamScanner},
};

/// The configuration for the search worker.
#[derive(Clone, Debug, Default)]
struct Config {
    /// Skip origins larger than this many bytes.
    max_size: Option<u64>,
    /// Descend into directories.
    recurse: bool,
}

/// A builder for configuring and constructing a search worker.
#[derive(Clone, Debug, Default)]
pub(crate) struct SearchWorkerBuilder {
    config: Config,
}

impl SearchWorkerBuilder {
    /// Create a new builder for configuring and constructing a search
    /// worker.
    pub(crate) fn new() -> SearchWorkerBuilder {
        SearchWorkerBuilder::default()
    }

    /// Create a new search worker from the given scanner, backend and
    /// printer.
    pub(crate) fn build<W: WriteColor>(
        &self,
        scanner: StreamScanner,
        backend: Box<dyn PatternScanner>,
        printer: Printer<W>,
    ) -> SearchWorker<W> {
        SearchWorker {
            config: self.config.clone(),
            scanner,
            backend,
            printer,
            matched: false,
        }
    }

    /// Skip origins larger than the given number of bytes.
    pub(crate) fn max_size(
        &mut self,
        max_size: Option<u64>,
    ) -> &mut SearchWorkerBuilder {
        self.config.max_size = max_size;
        self
    }

    /// Descend into directories given on the command line.
    pub(crate) fn recurse(&mut self, yes: bool) -> &mut SearchWorkerBuilder {
        self.config.recurse = yes;
        self
    }
}

/// The printer used by this search worker.
#[derive(Debug)]
pub(crate) enum Printer<W> {
    /// The standard printer: offsets or verbose per-match lines.
    Standard(Standard<W>),
    /// The summary printer: counts or matching origin names.
    Summary(Summary<W>),
}

/// A worker for executing searches.
///
/// It is intended for a single worker to execute many searches, one per
/// origin, and is generally intended to be used from a single thread.
pub(crate) struct SearchWorker<W> {
    config: Config,
    scanner: StreamScanner,
    backend: Box<dyn PatternScanner>,
    printer: Printer<W>,
    matched: bool,
}

impl<W: WriteColor> SearchWorker<W> {
    /// Returns true if any search executed by this worker found a match.
    pub(crate) fn matched(&self) -> bool {
        self.matched
    }

    /// Execute a search over the given command line argument, which may
    /// be `-` for stdin, a file or a directory.
    ///
    /// IO errors on individual origins are reported to stderr and do not
    /// propagate, so a recursive run keeps going past unreadable files.
    pub(crate) fn search_arg(&mut self, path: &Path) {
        if path == Path::new("-") {
            if let Err(err) = self.search_stdin() {
                err_message!("<stdin>: {}", err);
            }
            return;
        }
        if path.is_dir() {
            if !self.config.recurse {
                err_message!("{}: is a directory", path.display());
                return;
            }
            self.search_dir(path);
            return;
        }
        if let Err(err) = self.search_path(path) {
            err_message!("{}: {}", path.display(), err);
        }
    }

    /// Execute a search over a finite region at the given absolute base
    /// offset, e.g. a block read from another process's memory.
    pub(crate) fn search_slice_at(
        &mut self,
        origin: &str,
        base: u64,
        slice: &[u8],
    ) -> io::Result<()> {
        let stats = match self.printer {
            Printer::Standard(ref mut p) => {
                self.scanner.search_slice_at(&*self.backend, origin, base, slice, p)
            }
            Printer::Summary(ref mut p) => {
                self.scanner.search_slice_at(&*self.backend, origin, base, slice, p)
            }
        }?;
        self.matched = self.matched || stats.has_match();
        Ok(())
    }

    fn search_dir(&mut self, dir: &Path) {
        for result in walkdir::WalkDir::new(dir) {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    err_message!("{}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Err(err) = self.search_path(entry.path()) {
                err_message!("{}: {}", entry.path().display(), err);
            }
        }
    }

    fn search_stdin(&mut self) -> io::Result<()> {
        let stats = match self.printer {
            Printer::Standard(ref mut p) => {
                self.scanner.search_stdin(&*self.backend, p)
            }
            Printer::Summary(ref mut p) => {
                self.scanner.search_stdin(&*self.backend, p)
            }
        }?;
        self.matched = self.matched || stats.has_match();
        Ok(())
    }

    fn search_path(&mut self, path: &Path) -> io::Result<()> {
        if let Some(max_size) = self.config.max_size {
            let len = path.metadata()?.len();
            if len > max_size {
                log::warn!(
                    "{}: skipped: {} bytes exceeds the size limit",
                    path.display(),
                    len
                );
                return Ok(());
            }
        }
        let stats: ScanStats = match self.printer {
            Printer::Standard(ref mut p) => {
                self.scanner.search_path(&*self.backend, path, p)
            }
            Printer::Summary(ref mut p) => {
                self.scanner.search_path(&*self.backend, path, p)
            }
        }?;
        self.matched = self.matched || stats.has_match();
        Ok(())
    }
}

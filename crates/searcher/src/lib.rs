/*!
This crate provides the streaming scanner that drives a scan backend over
an input of unbounded size.

# Brief overview

The principal type is [`StreamScanner`], configured and built with
[`StreamScannerBuilder`]. A `StreamScanner` owns the acquisition policy: a
finite origin (a regular file) is memory mapped and scanned in one pass,
while stdin, pipes and followed files are read through a fixed-capacity
working buffer with a refill/carry protocol. The protocol re-presents the
unresolved tail of each buffer together with the next refill, so a match
that straddles a refill boundary is still found (when the backend reports
partial-match boundaries), while a clamp on the carried tail bounds memory
growth.

Matches are delivered to a [`Sink`]: an implementation decides whether to
print, count, or stop the scan early. The printers in `binfind-printer`
implement `Sink`; trivially simple implementations are also possible:

```no_run
use binfind_matcher::{RegexScanner, ScanFlow};
use binfind_searcher::{MatchSpan, Sink, StreamScanner};

struct Offsets(Vec<u64>);

impl Sink for Offsets {
    fn matched(
        &mut self,
        _origin: &str,
        mat: &MatchSpan<'_>,
    ) -> std::io::Result<ScanFlow> {
        self.0.push(mat.start());
        Ok(ScanFlow::Continue)
    }
}

let backend = RegexScanner::new("needle", false)?;
let mut sink = Offsets(vec![]);
StreamScanner::new().search_path(
    &backend,
    std::path::Path::new("haystack.bin"),
    &mut sink,
)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

#![deny(missing_docs)]

use std::{fs::File, io, path::Path, time::Duration};

use binfind_matcher::{Boundary, PatternScanner, ScanFlow};

use crate::chunk_buffer::{ChunkBuffer, DEFAULT_BUFFER_CAPACITY};

mod chunk_buffer;

/// A single match within the logical input stream.
///
/// Values of this type are ephemeral: they borrow the working buffer and
/// are consumed immediately by the sink, never retained.
#[derive(Clone, Debug)]
pub struct MatchSpan<'b> {
    start: u64,
    end: u64,
    bytes: &'b [u8],
}

impl<'b> MatchSpan<'b> {
    /// The absolute offset of the first matched byte.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// The absolute offset one past the last matched byte.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// The matched bytes.
    pub fn bytes(&self) -> &'b [u8] {
        self.bytes
    }
}

/// Summary data for one origin's scan, passed to [`Sink::finish`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanStats {
    matches: u64,
}

impl ScanStats {
    /// The number of matches delivered to the sink.
    pub fn matches(&self) -> u64 {
        self.matches
    }

    /// Returns true if at least one match was delivered.
    pub fn has_match(&self) -> bool {
        self.matches > 0
    }
}

/// A trait that describes how match results are consumed.
///
/// `begin` runs before the first byte of an origin is scanned and is where
/// per-origin state must be reset; `finish` runs after the last byte (or
/// after an early stop). Errors returned from any routine abort the scan
/// of the current origin and are propagated to the caller.
pub trait Sink {
    /// Called before scanning an origin starts.
    fn begin(&mut self, _origin: &str) -> io::Result<()> {
        Ok(())
    }

    /// Called once per match. Returning [`ScanFlow::Stop`] ends the scan
    /// of this origin early; `finish` still runs.
    fn matched(
        &mut self,
        origin: &str,
        mat: &MatchSpan<'_>,
    ) -> io::Result<ScanFlow>;

    /// Called after scanning an origin ends.
    fn finish(&mut self, _origin: &str, _stats: &ScanStats) -> io::Result<()> {
        Ok(())
    }
}

impl<'a, S: Sink> Sink for &'a mut S {
    fn begin(&mut self, origin: &str) -> io::Result<()> {
        (**self).begin(origin)
    }

    fn matched(
        &mut self,
        origin: &str,
        mat: &MatchSpan<'_>,
    ) -> io::Result<ScanFlow> {
        (**self).matched(origin, mat)
    }

    fn finish(&mut self, origin: &str, stats: &ScanStats) -> io::Result<()> {
        (**self).finish(origin, stats)
    }
}

/// The configuration of a stream scanner. Fixed once the scanner is built.
#[derive(Clone, Copy, Debug)]
struct Config {
    /// The working buffer capacity for sequential scans.
    capacity: usize,
    /// Keep polling for new data after end of input.
    follow: bool,
    /// Stop after the first buffer pass, restricting matches to the head
    /// of the origin.
    match_start_only: bool,
    /// Never memory map; always read sequentially.
    force_sequential: bool,
    /// The delay between polls in follow mode.
    poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            capacity: DEFAULT_BUFFER_CAPACITY,
            follow: false,
            match_start_only: false,
            force_sequential: false,
            poll_interval: Duration::from_micros(100),
        }
    }
}

/// A builder for configuring and constructing a [`StreamScanner`].
#[derive(Clone, Debug, Default)]
pub struct StreamScannerBuilder {
    config: Config,
}

impl StreamScannerBuilder {
    /// Create a new builder with a default configuration.
    pub fn new() -> StreamScannerBuilder {
        StreamScannerBuilder { config: Config::default() }
    }

    /// Build a stream scanner from this configuration.
    pub fn build(&self) -> StreamScanner {
        StreamScanner { config: self.config }
    }

    /// Set the working buffer capacity used for sequential scans.
    ///
    /// This is set to a reasonable default (1 MiB) and rarely needs to be
    /// changed, except in tests that want to exercise refill boundaries.
    pub fn capacity(&mut self, capacity: usize) -> &mut StreamScannerBuilder {
        self.config.capacity = capacity;
        self
    }

    /// When enabled, reaching the end of a sequential input does not end
    /// the scan; the scanner keeps polling for new data until the sink
    /// stops it or the process is terminated.
    pub fn follow(&mut self, yes: bool) -> &mut StreamScannerBuilder {
        self.config.follow = yes;
        self
    }

    /// When enabled, only the first buffer pass of each origin is scanned.
    ///
    /// This implies sequential reading: a memory mapped scan has no buffer
    /// passes to cut short.
    pub fn match_start_only(
        &mut self,
        yes: bool,
    ) -> &mut StreamScannerBuilder {
        self.config.match_start_only = yes;
        self
    }

    /// Never memory map regular files; read them sequentially instead.
    pub fn force_sequential(
        &mut self,
        yes: bool,
    ) -> &mut StreamScannerBuilder {
        self.config.force_sequential = yes;
        self
    }
}

/// Applies a scan backend over mapped regions or open streams, feeding
/// matches to a [`Sink`].
#[derive(Clone, Debug)]
pub struct StreamScanner {
    config: Config,
}

impl StreamScanner {
    /// Create a stream scanner with a default configuration.
    pub fn new() -> StreamScanner {
        StreamScannerBuilder::new().build()
    }

    /// Scan the file at the given path.
    ///
    /// Regular files are memory mapped and scanned in one pass unless the
    /// configuration demands the sequential protocol (forced sequential
    /// reading, follow mode or match-start-only mode); anything else falls
    /// back to sequential reading. A file that cannot be mapped is also
    /// read sequentially rather than failing.
    pub fn search_path<S: Sink>(
        &self,
        scanner: &dyn PatternScanner,
        path: &Path,
        sink: S,
    ) -> io::Result<ScanStats> {
        let origin = path.display().to_string();
        let mut file = File::open(path)?;
        let meta = file.metadata()?;
        if self.config.force_sequential
            || self.config.follow
            || self.config.match_start_only
            || !meta.is_file()
        {
            return self.search_reader(scanner, &origin, &mut file, sink);
        }
        if meta.len() == 0 {
            let mut sink = sink;
            sink.begin(&origin)?;
            let stats = ScanStats::default();
            sink.finish(&origin, &stats)?;
            return Ok(stats);
        }
        // SAFETY: the file is opened read-only and the map is dropped
        // before this routine returns. If another process truncates the
        // file while we scan, we may get a SIGBUS, like every mmap based
        // search tool.
        match unsafe { memmap::Mmap::map(&file) } {
            Ok(map) => self.search_slice(scanner, &origin, &map, sink),
            Err(err) => {
                log::debug!(
                    "{}: failed to mmap, falling back to reading: {}",
                    origin,
                    err
                );
                self.search_reader(scanner, &origin, &mut file, sink)
            }
        }
    }

    /// Scan standard input with the sequential protocol.
    pub fn search_stdin<S: Sink>(
        &self,
        scanner: &dyn PatternScanner,
        sink: S,
    ) -> io::Result<ScanStats> {
        self.search_reader(scanner, "-", &mut io::stdin().lock(), sink)
    }

    /// Scan an already-mapped finite region, reporting offsets relative
    /// to its start.
    pub fn search_slice<S: Sink>(
        &self,
        scanner: &dyn PatternScanner,
        origin: &str,
        slice: &[u8],
        sink: S,
    ) -> io::Result<ScanStats> {
        self.search_slice_at(scanner, origin, 0, slice, sink)
    }

    /// Scan a finite region whose first byte lives at absolute offset
    /// `base` within its origin. Used for process memory regions, where
    /// offsets must reflect the remote address space.
    pub fn search_slice_at<S: Sink>(
        &self,
        scanner: &dyn PatternScanner,
        origin: &str,
        base: u64,
        slice: &[u8],
        mut sink: S,
    ) -> io::Result<ScanStats> {
        sink.begin(origin)?;
        let mut stats = ScanStats::default();
        let mut sink_err: Option<io::Error> = None;
        scanner.scan(slice, &mut |s, e| {
            let mat = MatchSpan {
                start: base + s as u64,
                end: base + e as u64,
                bytes: &slice[s..e],
            };
            match sink.matched(origin, &mat) {
                Ok(flow) => {
                    stats.matches += 1;
                    flow
                }
                Err(err) => {
                    sink_err = Some(err);
                    ScanFlow::Stop
                }
            }
        });
        if let Some(err) = sink_err {
            return Err(err);
        }
        sink.finish(origin, &stats)?;
        Ok(stats)
    }

    /// Scan an open stream with the sequential refill/carry protocol.
    ///
    /// The working buffer is created here and discarded when this
    /// origin's scan ends. The carried tail is clamped to at most half
    /// the buffer capacity, which bounds memory at the cost of matches
    /// whose partial prefix already spans more than half a buffer.
    pub fn search_reader<R: io::Read, S: Sink>(
        &self,
        scanner: &dyn PatternScanner,
        origin: &str,
        rdr: &mut R,
        mut sink: S,
    ) -> io::Result<ScanStats> {
        sink.begin(origin)?;
        let mut stats = ScanStats::default();
        let mut buf = ChunkBuffer::with_capacity(self.config.capacity);
        loop {
            let nread = buf.fill(rdr)?;
            if nread == 0 {
                if self.config.follow {
                    std::thread::sleep(self.config.poll_interval);
                    continue;
                }
                break;
            }

            let mut sink_err: Option<io::Error> = None;
            let mut nmatched = 0u64;
            let boundary = {
                let haystack = buf.buffer();
                let base = buf.absolute_offset();
                scanner.scan(haystack, &mut |s, e| {
                    let mat = MatchSpan {
                        start: base + s as u64,
                        end: base + e as u64,
                        bytes: &haystack[s..e],
                    };
                    match sink.matched(origin, &mat) {
                        Ok(flow) => {
                            nmatched += 1;
                            flow
                        }
                        Err(err) => {
                            sink_err = Some(err);
                            ScanFlow::Stop
                        }
                    }
                })
            };
            stats.matches += nmatched;
            if let Some(err) = sink_err {
                return Err(err);
            }
            match boundary {
                Boundary::Stop => break,
                Boundary::Resolved => buf.consume_all(),
                Boundary::Partial(pos) => {
                    let mut consume = pos
                        .max(self.config.capacity / 2)
                        .min(buf.buffer().len());
                    // a full buffer must always free at least one byte
                    if consume == 0 && buf.is_full() {
                        consume = 1;
                    }
                    buf.consume(consume);
                }
            }
            if self.config.match_start_only {
                break;
            }
        }
        sink.finish(origin, &stats)?;
        Ok(stats)
    }
}

impl Default for StreamScanner {
    fn default() -> StreamScanner {
        StreamScanner::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use binfind_matcher::{
        MaskScanner, RegexScanner, ScannerKind, build_scanner,
    };
    use binfind_pattern::{ByteMask, PatternCompilerBuilder, Representation};

    /// Collects (start, end) offsets, optionally stopping after a fixed
    /// number of matches.
    #[derive(Default)]
    struct Collect {
        got: Vec<(u64, u64)>,
        stop_after: Option<usize>,
        begun: usize,
        finished: usize,
    }

    impl Sink for Collect {
        fn begin(&mut self, _origin: &str) -> io::Result<()> {
            self.begun += 1;
            Ok(())
        }

        fn matched(
            &mut self,
            _origin: &str,
            mat: &MatchSpan<'_>,
        ) -> io::Result<ScanFlow> {
            self.got.push((mat.start(), mat.end()));
            match self.stop_after {
                Some(n) if self.got.len() >= n => Ok(ScanFlow::Stop),
                _ => Ok(ScanFlow::Continue),
            }
        }

        fn finish(
            &mut self,
            _origin: &str,
            _stats: &ScanStats,
        ) -> io::Result<()> {
            self.finished += 1;
            Ok(())
        }
    }

    fn regex(pattern: &str) -> RegexScanner {
        RegexScanner::new(pattern, false).unwrap()
    }

    #[test]
    fn slice_scan_reports_absolute_offsets() {
        let backend = regex("ab");
        let mut sink = Collect::default();
        let stats = StreamScanner::new()
            .search_slice(&backend, "test", b"ab..ab", &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(0, 2), (4, 6)]);
        assert_eq!(stats.matches(), 2);
        assert_eq!((sink.begun, sink.finished), (1, 1));
    }

    #[test]
    fn slice_scan_with_base_offset() {
        let backend = regex("ab");
        let mut sink = Collect::default();
        StreamScanner::new()
            .search_slice_at(&backend, "memory", 0x1000, b"..ab", &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(0x1002, 0x1004)]);
    }

    #[test]
    fn refill_boundary_match_found_exactly_once() {
        // The match is deliberately placed so that it straddles the
        // boundary between the first and second buffer fill.
        let mut hay = vec![b'x'; 14];
        hay.extend_from_slice(b"needle");
        hay.extend(vec![b'y'; 12]);

        let backend = regex("needle");
        let mut sink = Collect::default();
        let scanner = StreamScannerBuilder::new().capacity(16).build();
        let stats = scanner
            .search_reader(&backend, "test", &mut &hay[..], &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(14, 20)]);
        assert_eq!(stats.matches(), 1);
    }

    #[test]
    fn sequential_agrees_with_slice() {
        let hay: Vec<u8> =
            b"abcd".iter().cycle().take(1000).copied().collect();
        let backend = regex("cdab");

        let mut seq = Collect::default();
        StreamScannerBuilder::new()
            .capacity(32)
            .build()
            .search_reader(&backend, "test", &mut &hay[..], &mut seq)
            .unwrap();

        let mut all = Collect::default();
        StreamScanner::new()
            .search_slice(&backend, "test", &hay, &mut all)
            .unwrap();

        assert!(!all.got.is_empty());
        assert_eq!(seq.got, all.got);
    }

    #[test]
    fn stop_signal_ends_scan_early() {
        let backend = regex("a");
        let mut sink = Collect { stop_after: Some(2), ..Collect::default() };
        let stats = StreamScanner::new()
            .search_slice(&backend, "test", b"aaaaa", &mut sink)
            .unwrap();
        assert_eq!(stats.matches(), 2);
        assert_eq!(sink.finished, 1);
    }

    #[test]
    fn match_start_only_scans_one_buffer() {
        let mut hay = b"needle".to_vec();
        hay.extend(vec![b'x'; 100]);
        hay.extend_from_slice(b"needle");

        let backend = regex("needle");
        let mut sink = Collect::default();
        StreamScannerBuilder::new()
            .capacity(64)
            .match_start_only(true)
            .build()
            .search_reader(&backend, "test", &mut &hay[..], &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(0, 6)]);
    }

    #[test]
    fn match_start_only_applies_to_regular_files() {
        // Regular files normally go through the mmap path; with
        // match_start_only they must fall back to the sequential protocol
        // so that only the head of the file is scanned.
        let dir = std::env::temp_dir()
            .join(format!("binfind-searcher-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hay.bin");
        let mut hay = b"needle".to_vec();
        hay.extend(vec![b'x'; 100]);
        hay.extend_from_slice(b"needle");
        std::fs::write(&path, &hay).unwrap();

        let backend = regex("needle");
        let mut sink = Collect::default();
        StreamScannerBuilder::new()
            .capacity(64)
            .match_start_only(true)
            .build()
            .search_path(&backend, &path, &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(0, 6)]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mask_backend_misses_straddling_match_by_design() {
        // The substring/mask backends never report a partial boundary,
        // so a match across a refill is lost. This pins the documented
        // limitation.
        let mut hay = vec![b'x'; 14];
        hay.extend_from_slice(b"needle");

        let backend =
            MaskScanner::new(&[ByteMask::exact(b"needle".to_vec())]).unwrap();
        let mut sink = Collect::default();
        StreamScannerBuilder::new()
            .capacity(16)
            .build()
            .search_reader(&backend, "test", &mut &hay[..], &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![]);
    }

    #[test]
    fn compiled_hex_pattern_end_to_end() {
        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Regex);
        let set = b.build().compile("deadbeef").unwrap();
        let backend = build_scanner(ScannerKind::Regex, &set, false).unwrap();

        // written in reading order, matched little-endian
        let hay = b"..\xef\xbe\xad\xde..";
        let mut sink = Collect::default();
        StreamScanner::new()
            .search_slice(&*backend, "test", hay, &mut sink)
            .unwrap();
        assert_eq!(sink.got, vec![(2, 6)]);
    }
}

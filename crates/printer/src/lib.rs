/*!
This crate provides printers that implement the `Sink` trait from the
[`binfind-searcher`](https://docs.rs/binfind-searcher) crate.

# Brief overview

The [`Standard`] printer shows results in a human readable format. Its
default layout prints each origin once followed by a tab-indented line of
hexadecimal match offsets; its verbose layout prints one line per match
with a rendering of the matched bytes (a hex dump, a sanitized text dump
or a GUID).

The [`Summary`] printer shows *aggregate* results for one origin: either
a match count or just the origin name of an origin that matched at all.

# Example

This example shows how to create a standard printer and scan a slice.

```
use {
    binfind_matcher::RegexScanner,
    binfind_printer::Standard,
    binfind_searcher::StreamScanner,
};

const HAYSTACK: &[u8] = b"\x00\x01magic\x02\x03magic\x04";

let backend = RegexScanner::new("magic", false)?;
let mut printer = Standard::new_no_color(vec![]);
StreamScanner::new().search_slice(
    &backend,
    "haystack.bin",
    HAYSTACK,
    &mut printer,
)?;

let output = String::from_utf8(printer.into_inner().into_inner())?;
let expected = "haystack.bin\n\t00000002, 00000009\n";
assert_eq!(output, expected);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

#![deny(missing_docs)]

pub use crate::{
    color::ColorSpecs,
    standard::{MatchRender, Standard, StandardBuilder},
    summary::{Summary, SummaryBuilder, SummaryKind},
};

mod color;
mod standard;
mod summary;
mod util;

//! alloctrace turns the memory-allocation stacks that [`dtrace`] records while a program runs
//! into one row per allocation, naming the allocator, the number of bytes requested, and the
//! call site that is responsible for the request. The rows are plain CSV, ready to be fed into
//! whatever statistical tooling you like.
//!
//! The interesting part is deciding _which_ frame of an allocation stack is "the caller". The
//! innermost frames are almost always the allocator itself (`malloc`, `calloc`, `ruby_xrealloc`
//! and friends), and frames from other libraries tell you nothing about the program under test.
//! alloctrace skips both, and reports the first frame that belongs to the target binary and is
//! not an allocator wrapper.
//!
//! # Command-line use
//!
//! ## Per-event stacks
//!
//! The `ustack` dialect is what a dtrace script that prints three (or four) header lines and a
//! `ustack()` for every `malloc` entry produces:
//!
//! ```text
//! malloc
//! 1234567
//! 40
//!               ruby`ruby_xmalloc+0x12
//!               ruby`rb_str_new+0x20
//!               ruby`main+0x5
//!
//! ```
//!
//! To attribute such a trace, run:
//!
//! ```console
//! $ alloctrace-ustack --test-type basic allocations.csv out/basic.dtrace
//! ```
//!
//! ## Aggregated histograms
//!
//! The `histogram` dialect is a pre-aggregated listing where every line is a bucket of
//! allocations of the same size, with an address-annotated stack:
//!
//! ```text
//! ----
//! 12 calls for 40 bytes: 0x4005d0 (libc.so.6) malloc|0x4f00a0 (ruby) rb_str_new [string.c:812]
//! ```
//!
//! ```console
//! $ alloctrace-histogram buckets.csv histogram.txt
//! ```
//!
//! If you are not sure which one you have, `alloctrace-guess` will look at the input and pick.
//!
//! # Programmatic access
//!
//! Every dialect implements [`attribute::Attribute`], which reads from any [`std::io::BufRead`]
//! and writes CSV to any [`std::io::Write`]:
//!
//! ```
//! use alloctrace::attribute::{ustack, Attribute};
//!
//! let input = "\
//! String.new
//! 1234567
//! 40
//! ruby`string_alloc+0x10
//! ruby`rb_str_new+0x20
//! ruby`malloc+0x5
//!
//! ";
//! let mut output = Vec::new();
//! let summary = ustack::Attributor::default()
//!     .attribute(input.as_bytes(), &mut output)
//!     .unwrap();
//! assert_eq!(summary.emitted, 1);
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "allocator,timestamp,bytes_requested,caller\nString.new,1234567,40,rb_str_new\n"
//! );
//! ```
//!
//!   [`dtrace`]: https://www.joyent.com/dtrace

#![deny(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
extern crate log;

/// Allocation attribution for the supported trace dialects.
///
/// See the [crate-level documentation] for details.
///
///   [crate-level documentation]: ../index.html
pub mod attribute;

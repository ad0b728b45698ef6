use once_cell::sync::Lazy;
use regex::Regex;

// 0x55d0c0a1b2c3 (/usr/lib/libruby.so.3.2) rb_str_new [string.c:812]
static ANNOTATED_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:0x)?[[:xdigit:]]+\s+\((?P<library>[^)]*)\)\s+(?P<function>.+?)(?:\s+\[(?P<file>[^\]]+):(?P<line>\d+)\])?$",
    )
    .expect("the annotated frame pattern is valid")
});

/// A single stack entry whose line could be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackFrame<'a> {
    /// The library or binary the frame belongs to.
    pub library: &'a str,
    /// The function name, with any offset removed.
    pub function: &'a str,
    /// The source file, if the tracer reported one.
    pub file: Option<&'a str>,
    /// The source line, if the tracer reported one.
    pub line: Option<u32>,
}

/// One line of a stack, either parsed into a [`StackFrame`] or kept as-is.
///
/// Unparsed lines still occupy their position in the stack, so frame indices line up with the
/// raw trace, but they never qualify as a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// The line matched the expected frame layout.
    Parsed(StackFrame<'a>),
    /// The line did not match; this holds the trimmed raw line.
    Unparsed(&'a str),
}

impl<'a> Frame<'a> {
    /// Parses a dtrace `ustack()` line of the form ``library`function+0x1a``.
    ///
    /// The offset is optional and is discarded whatever its form. A line without a backtick
    /// cannot be attributed to a library and is returned as [`Frame::Unparsed`].
    pub fn from_backtick(line: &'a str) -> Self {
        let line = line.trim();
        let (library, rest) = match line.split_once('`') {
            Some(parts) => parts,
            None => return Frame::Unparsed(line),
        };
        let function = rest.split_once('+').map_or(rest, |(function, _)| function);
        Frame::Parsed(StackFrame {
            library,
            function,
            file: None,
            line: None,
        })
    }

    /// Parses an address-annotated line of the form
    /// `0x4f00a0 (library) function [file.c:812]`, where the trailing location is optional.
    pub fn from_annotated(line: &'a str) -> Self {
        let line = line.trim();
        let caps = match ANNOTATED_FRAME.captures(line) {
            Some(caps) => caps,
            None => return Frame::Unparsed(line),
        };

        // The pattern makes `library` and `function` mandatory.
        let library = caps.name("library").map_or("", |m| m.as_str());
        let function = caps.name("function").map_or("", |m| m.as_str());
        let file = caps.name("file").map(|m| m.as_str());
        let lineno = match caps.name("line") {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => return Frame::Unparsed(line),
            },
            None => None,
        };

        Frame::Parsed(StackFrame {
            library,
            function,
            file,
            line: lineno,
        })
    }

    /// The parsed frame, if there is one.
    pub fn parsed(&self) -> Option<&StackFrame<'a>> {
        match self {
            Frame::Parsed(frame) => Some(frame),
            Frame::Unparsed(_) => None,
        }
    }

    /// Whether this line failed to parse.
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Frame::Unparsed(_))
    }
}

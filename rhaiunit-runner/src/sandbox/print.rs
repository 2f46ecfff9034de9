// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `print` host primitive.
//!
//! With several arguments, `print` sniffs whether the first one is a format string: if it contains
//! exactly as many `%` conversions as there are remaining arguments, the arguments are formatted
//! into it. Otherwise, or if formatting fails for any reason, all arguments are joined with a single
//! space.

use regex::Regex;
use rhai::{Dynamic, FLOAT, INT};
use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
    sync::LazyLock,
};
use swrite::{SWrite, swrite};

const CONVERSION_PATTERN: &str =
    r"%(?:%|(?P<flags>[-+ 0#]*)(?P<width>\d+)?(?:\.(?P<precision>\d+))?(?P<conv>[sdifexocb]))";

static CONVERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONVERSION_PATTERN).expect("conversion regex is valid"));

/// Widths and precisions above this are not formatted; the arguments are joined instead.
const MAX_FIELD_SIZE: usize = 1024;

/// Where `print` writes its output.
#[derive(Clone, Debug, Default)]
pub enum PrintSink {
    /// Standard output.
    #[default]
    Stdout,

    /// An in-memory buffer, shared with the creator of the sink.
    Buffer(Rc<RefCell<String>>),
}

impl PrintSink {
    /// Creates a sink that captures output, returning the sink and the shared buffer.
    pub fn buffer() -> (Self, Rc<RefCell<String>>) {
        let buf = Rc::new(RefCell::new(String::new()));
        (Self::Buffer(buf.clone()), buf)
    }

    /// Writes a single line.
    ///
    /// Write errors are ignored: printing never fails a script.
    pub fn write_line(&self, line: &str) {
        match self {
            Self::Stdout => {
                let _ = writeln!(io::stdout().lock(), "{line}");
            }
            Self::Buffer(buf) => {
                let mut buf = buf.borrow_mut();
                buf.push_str(line);
                buf.push('\n');
            }
        }
    }
}

/// Renders the arguments to a `print` call as a single line.
pub fn render(args: &[Dynamic]) -> String {
    match args {
        [] => String::new(),
        [single] => single.to_string(),
        [first, rest @ ..] => {
            if let Ok(format) = first.clone().into_immutable_string() {
                if count_conversions(format.as_str()) == rest.len() {
                    if let Some(formatted) = format_args(format.as_str(), rest) {
                        return formatted;
                    }
                }
            }
            join_args(args)
        }
    }
}

fn join_args(args: &[Dynamic]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        swrite!(out, "{arg}");
    }
    out
}

/// Counts `%` conversions, not counting `%%`.
fn count_conversions(format: &str) -> usize {
    CONVERSION_REGEX
        .captures_iter(format)
        .filter(|caps| caps.name("conv").is_some())
        .count()
}

/// Formats `args` into `format`, or returns `None` if any conversion does not fit its argument.
fn format_args(format: &str, args: &[Dynamic]) -> Option<String> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut last = 0;

    for caps in CONVERSION_REGEX.captures_iter(format) {
        let whole = caps.get(0)?;
        out.push_str(&format[last..whole.start()]);
        last = whole.end();

        let Some(conv) = caps.name("conv") else {
            out.push('%');
            continue;
        };

        let spec = Spec {
            flags: caps.name("flags").map_or("", |m| m.as_str()),
            width: field_size(caps.name("width"))?,
            precision: field_size(caps.name("precision"))?,
        };
        let arg = args.next()?;
        let body = convert(conv.as_str(), &spec, arg)?;
        out.push_str(&spec.pad(body));
    }
    out.push_str(&format[last..]);

    Some(out)
}

/// Parses a width or precision. Returns `None` if it is present but too large to honor.
fn field_size(m: Option<regex::Match<'_>>) -> Option<Option<usize>> {
    match m {
        Some(m) => {
            let size: usize = m.as_str().parse().ok()?;
            (size <= MAX_FIELD_SIZE).then_some(Some(size))
        }
        None => Some(None),
    }
}

struct Spec<'a> {
    flags: &'a str,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec<'_> {
    fn has(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.has('+') {
            "+"
        } else if self.has(' ') {
            " "
        } else {
            ""
        }
    }

    fn pad(&self, body: Formatted) -> String {
        let len = body.sign.chars().count() + body.digits.chars().count();
        let fill = self.width.unwrap_or(0).saturating_sub(len);
        if fill == 0 {
            return format!("{}{}", body.sign, body.digits);
        }

        if self.has('-') {
            format!("{}{}{}", body.sign, body.digits, " ".repeat(fill))
        } else if self.has('0') && body.numeric {
            format!("{}{}{}", body.sign, "0".repeat(fill), body.digits)
        } else {
            format!("{}{}{}", " ".repeat(fill), body.sign, body.digits)
        }
    }
}

struct Formatted {
    sign: &'static str,
    digits: String,
    numeric: bool,
}

impl Formatted {
    fn text(text: String) -> Self {
        Self {
            sign: "",
            digits: text,
            numeric: false,
        }
    }
}

fn convert(conv: &str, spec: &Spec<'_>, arg: &Dynamic) -> Option<Formatted> {
    match conv {
        "s" => {
            let mut text = arg.to_string();
            if let Some(precision) = spec.precision {
                text = text.chars().take(precision).collect();
            }
            Some(Formatted::text(text))
        }
        "b" => {
            let value = if arg.is_unit() {
                false
            } else {
                arg.as_bool().unwrap_or(true)
            };
            Some(Formatted::text(value.to_string()))
        }
        "c" => {
            let c = match arg.as_char() {
                Ok(c) => c,
                Err(_) => char::from_u32(u32::try_from(arg.as_int().ok()?).ok()?)?,
            };
            Some(Formatted::text(c.to_string()))
        }
        "d" | "i" => {
            if spec.precision.is_some() {
                return None;
            }
            let value: INT = arg.as_int().ok()?;
            Some(Formatted {
                sign: spec.sign(value < 0),
                digits: value.unsigned_abs().to_string(),
                numeric: true,
            })
        }
        "x" | "o" => {
            if spec.precision.is_some() {
                return None;
            }
            let value: INT = arg.as_int().ok()?;
            // Negative values are rendered as two's complement, like C.
            let bits = value as u64;
            let mut digits = if conv == "x" {
                format!("{bits:x}")
            } else {
                format!("{bits:o}")
            };
            if spec.has('#') {
                digits.insert_str(0, if conv == "x" { "0x" } else { "0" });
            }
            Some(Formatted {
                sign: "",
                digits,
                numeric: true,
            })
        }
        "f" => {
            let value: FLOAT = arg.as_float().ok()?;
            let precision = spec.precision.unwrap_or(6);
            Some(Formatted {
                sign: spec.sign(value.is_sign_negative() && value != 0.0),
                digits: format!("{:.precision$}", value.abs()),
                numeric: true,
            })
        }
        "e" => {
            let value: FLOAT = arg.as_float().ok()?;
            let precision = spec.precision.unwrap_or(6);
            Some(Formatted {
                sign: spec.sign(value.is_sign_negative() && value != 0.0),
                digits: scientific(value.abs(), precision),
                numeric: true,
            })
        }
        _ => None,
    }
}

/// Renders a non-negative float as `d.dddddde+xx`.
fn scientific(value: FLOAT, precision: usize) -> String {
    let rendered = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = rendered.split_once('e') else {
        return rendered;
    };
    let (sign, exponent) = match exponent.strip_prefix('-') {
        Some(exponent) => ('-', exponent),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{exponent:0>2}")
}

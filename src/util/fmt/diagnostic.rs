use std::{
    fmt,
    io::{self, Write},
};

use crate::token::{Located, Location};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Renders a located diagnostic, quoting the offending source line with a
/// caret under the reported column:
///
/// ```text
/// error: unexpected character '$'
///   --> main.nsl:1:5
///     |
///   1 | let $
///     |     ^
/// ```
pub fn render_located<E: fmt::Display>(
    w: &mut impl Write,
    severity: Severity,
    file: &str,
    src: &str,
    located: &Located<E>,
) -> io::Result<()> {
    render(w, severity, file, src, Some(located.loc), &located.inner)
}

/// Renders a diagnostic; without a location only the header is written.
pub fn render(
    w: &mut impl Write,
    severity: Severity,
    file: &str,
    src: &str,
    loc: Option<Location>,
    message: &dyn fmt::Display,
) -> io::Result<()> {
    writeln!(w, "{severity}: {message}")?;
    let Some(loc) = loc else {
        return writeln!(w, "  --> {file}");
    };
    writeln!(w, "  --> {file}:{loc}")?;

    // Locations past the last line (end of input) only get the header.
    let Some(line) = src.lines().nth(loc.row.saturating_sub(1)) else {
        return Ok(());
    };
    // Tabs are kept so the caret lines up however the terminal expands them.
    let pad: String = line
        .chars()
        .take(loc.col.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let width = loc.row.to_string().len().max(3);
    let gutter = " ".repeat(width);
    writeln!(w, "{gutter} |")?;
    writeln!(w, "{:>width$} | {line}", loc.row)?;
    writeln!(w, "{gutter} | {pad}^")
}

pub fn render_located_string<E: fmt::Display>(
    severity: Severity,
    file: &str,
    src: &str,
    located: &Located<E>,
) -> String {
    let mut buf = Vec::with_capacity(256);
    render_located(&mut buf, severity, file, src, located).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("diagnostic output is valid UTF-8")
}

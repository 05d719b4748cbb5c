//! Output sinks for sampler state and diagnostics.

use std::io;

/// A sink accepting text lines, name lists and value lists.
pub trait Writer {
    /// Writes a single line of text.
    fn message(&mut self, msg: &str) -> io::Result<()>;

    /// Writes an ordered list of names.
    fn names(&mut self, names: &[String]) -> io::Result<()>;

    /// Writes an ordered list of values.
    fn values(&mut self, values: &[f64]) -> io::Result<()>;
}

/// Writes comma-separated lines to any [`io::Write`], each prefixed with `prefix`.
///
/// ```rust
/// use adaptive_hmc::callbacks::{StreamWriter, Writer};
///
/// let mut writer = StreamWriter::new(Vec::new(), "# ");
/// writer.message("Step size = 0.5").unwrap();
/// writer.values(&[1.0, 2.5]).unwrap();
/// let out = String::from_utf8(writer.into_inner()).unwrap();
/// assert_eq!(out, "# Step size = 0.5\n# 1, 2.5\n");
/// ```
#[derive(Debug)]
pub struct StreamWriter<W: io::Write> {
    out: W,
    prefix: String,
}

impl<W: io::Write> StreamWriter<W> {
    pub fn new(out: W, prefix: impl Into<String>) -> Self {
        Self {
            out,
            prefix: prefix.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> Writer for StreamWriter<W> {
    fn message(&mut self, msg: &str) -> io::Result<()> {
        writeln!(self.out, "{}{}", self.prefix, msg)
    }

    fn names(&mut self, names: &[String]) -> io::Result<()> {
        writeln!(self.out, "{}{}", self.prefix, names.join(", "))
    }

    fn values(&mut self, values: &[f64]) -> io::Result<()> {
        writeln!(self.out, "{}{}", self.prefix, join_values(values))
    }
}

/// Keeps every line in memory. Handy for inspecting what a sampler reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VecWriter {
    pub lines: Vec<String>,
}

impl VecWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for VecWriter {
    fn message(&mut self, msg: &str) -> io::Result<()> {
        self.lines.push(msg.to_string());
        Ok(())
    }

    fn names(&mut self, names: &[String]) -> io::Result<()> {
        self.lines.push(names.join(", "));
        Ok(())
    }

    fn values(&mut self, values: &[f64]) -> io::Result<()> {
        self.lines.push(join_values(values));
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWriter;

impl Writer for NullWriter {
    fn message(&mut self, _msg: &str) -> io::Result<()> {
        Ok(())
    }

    fn names(&mut self, _names: &[String]) -> io::Result<()> {
        Ok(())
    }

    fn values(&mut self, _values: &[f64]) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_writer_collects_lines() {
        let mut w = VecWriter::new();
        w.message("hello").unwrap();
        w.names(&["a".to_string(), "b".to_string()]).unwrap();
        w.values(&[0.25, -1.0]).unwrap();
        assert_eq!(w.lines, vec!["hello", "a, b", "0.25, -1"]);
    }

    #[test]
    fn stream_writer_without_prefix() {
        let mut w = StreamWriter::new(Vec::new(), "");
        w.names(&["stepsize__".to_string()]).unwrap();
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), "stepsize__\n");
    }
}

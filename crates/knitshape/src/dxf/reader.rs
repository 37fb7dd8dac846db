//! Group-code pair reader for ASCII DXF.
//!
//! A DXF file is a flat list of `(code, value)` pairs, each spread over two
//! lines. The parser pulls pairs one at a time and pushes back the `0` pair
//! that starts the next entity once it has read past the current one.

use crate::error::ConvertError;

pub(crate) struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        // Some exporters write a UTF-8 BOM
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    /// Next pair, or `None` at end of input.
    pub(crate) fn next_pair(&mut self) -> Result<Option<(i32, String)>, ConvertError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // Tolerate trailing blank lines after EOF
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(invalid(format!(
                    "file ends at line {} without a value for group code {}",
                    self.line_number,
                    code_line.trim()
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            invalid(format!(
                "group code \"{}\" at line {} is not an integer",
                code_line.trim(),
                self.line_number - 1
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    /// Push one pair back so the next `next_pair` returns it again.
    pub(crate) fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "only one pair can be pushed back");
        self.buffer = Some(pair);
    }

    /// Skip pairs up to (not including) the next `0` code.
    pub(crate) fn skip_entity_body(&mut self) -> Result<(), ConvertError> {
        while let Some((code, value)) = self.next_pair()? {
            if code == 0 {
                self.put_back((code, value));
                break;
            }
        }
        Ok(())
    }

    /// Skip to the `ENDSEC` that closes the current section.
    pub(crate) fn skip_section(&mut self) -> Result<(), ConvertError> {
        loop {
            match self.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => return Ok(()),
                Some(_) => continue,
                None => return Err(invalid("section is missing its ENDSEC marker")),
            }
        }
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> ConvertError {
    ConvertError::Dxf {
        message: message.into(),
    }
}

pub(crate) fn parse_f64(raw: &str, context: &str) -> Result<f64, ConvertError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid(format!("{context}: cannot parse \"{raw}\" as a number")))
}

pub(crate) fn parse_i32(raw: &str, context: &str) -> Result<i32, ConvertError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| invalid(format!("{context}: cannot parse \"{raw}\" as an integer")))
}

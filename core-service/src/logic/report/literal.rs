//! INSTs / FunctionsRun literal encoding.
//!
//! Entry format: `[['nan', 'inf'], 0, 'FADD']`. Strings are single-quoted,
//! with `\` escaping `'` and `\`.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::logic::aggregate::InstEntry;
use crate::logic::error::LiteralError;
use crate::logic::trace::{AnomalyKind, KindSet};

pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn push_string_list<'a>(out: &mut String, items: impl Iterator<Item = &'a str>) {
    out.push('[');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote(item));
    }
    out.push(']');
}

pub fn render_entry(entry: &InstEntry) -> String {
    let mut out = String::from("[");
    push_string_list(&mut out, entry.kinds.iter().map(AnomalyKind::as_str));
    let _ = write!(out, ", {}, {}]", entry.operand, quote(&entry.instruction));
    out
}

/// `[e1, e2, ...]`; `[]` when there are no entries.
pub fn render_insts(entries: &[InstEntry]) -> String {
    let mut out = String::from("[");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&render_entry(entry));
    }
    out.push(']');
    out
}

pub fn render_functions(functions: &BTreeSet<String>) -> String {
    let mut out = String::new();
    push_string_list(&mut out, functions.iter().map(String::as_str));
    out
}

/// Read an INSTs literal back into entries.
pub fn parse_insts(literal: &str) -> Result<Vec<InstEntry>, LiteralError> {
    let mut reader = LiteralReader { chars: literal.chars().collect(), pos: 0 };
    let entries = reader.list(LiteralReader::entry)?;
    reader.skip_ws();
    if reader.pos < reader.chars.len() {
        return Err(LiteralError::Trailing(reader.pos));
    }
    Ok(entries)
}

struct LiteralReader {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralReader {
    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).map_or(false, |c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Result<char, LiteralError> {
        self.skip_ws();
        self.chars.get(self.pos).copied().ok_or(LiteralError::UnexpectedEnd(self.pos))
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        let found = self.peek()?;
        if found != expected {
            return Err(LiteralError::Expected { expected, offset: self.pos, found });
        }
        self.pos += 1;
        Ok(())
    }

    /// `[item, item, ...]`
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T, LiteralError>) -> Result<Vec<T>, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        if self.peek()? == ']' {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            match self.peek()? {
                ',' => self.pos += 1,
                ']' => {
                    self.pos += 1;
                    return Ok(items);
                }
                found => return Err(LiteralError::Expected { expected: ']', offset: self.pos, found }),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        self.expect('\'')?;
        let mut out = String::new();
        loop {
            let c = *self.chars.get(self.pos).ok_or(LiteralError::UnexpectedEnd(self.pos))?;
            self.pos += 1;
            match c {
                '\'' => return Ok(out),
                '\\' => {
                    let escaped = *self.chars.get(self.pos).ok_or(LiteralError::UnexpectedEnd(self.pos))?;
                    self.pos += 1;
                    out.push(escaped);
                }
                other => out.push(other),
            }
        }
    }

    fn operand(&mut self) -> Result<u32, LiteralError> {
        self.skip_ws();
        let start = self.pos;
        while self.chars.get(self.pos).map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().map_err(|_| LiteralError::BadOperand(start))
    }

    fn entry(&mut self) -> Result<InstEntry, LiteralError> {
        self.expect('[')?;
        let names = self.list(Self::string)?;
        let mut kinds = KindSet::new();
        for name in names {
            let kind = AnomalyKind::from_token(&name).ok_or(LiteralError::UnknownKind(name))?;
            kinds.insert(kind);
        }
        self.expect(',')?;
        let operand = self.operand()?;
        self.expect(',')?;
        let instruction = self.string()?;
        self.expect(']')?;
        Ok(InstEntry { kinds, operand, instruction })
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Parsed path expressions such as `app.database.port` or `hosts[0].address`.

use crate::error::PathError;

use core::fmt;
use core::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// Source or reference alias the path starts from.
    Root(String),
    /// Named child of a map or object.
    Attr(String),
    /// Positional child of a list or tuple.
    Index(usize),
}

impl Step {
    /// Tag mixed into the step hash so that `a.0` and `a[0]` never collide.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Step::Root(_) => b'r',
            Step::Attr(_) => b'a',
            Step::Index(_) => b'i',
        }
    }

    pub(crate) fn text(&self) -> String {
        match self {
            Step::Root(s) | Step::Attr(s) => s.clone(),
            Step::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Step::Root(s) => f.write_str(s),
            Step::Attr(s) if is_plain(s) => write!(f, ".{s}"),
            Step::Attr(s) => write!(f, "[{s:?}]"),
            Step::Index(i) => write!(f, "[{i}]"),
        }
    }
}

fn is_plain(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}

fn is_ident_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']' | '"' | '\'') && !c.is_whitespace()
}

/// An immutable, non-empty sequence of steps starting at a root alias.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(text: &str) -> Result<Path, PathError> {
        Parser::new(text).parse()
    }

    pub fn root(&self) -> &str {
        match &self.steps[0] {
            Step::Root(alias) => alias,
            _ => "",
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Path made of the root alias only.
    pub fn from_root(alias: &str) -> Path {
        Path {
            steps: vec![Step::Root(alias.to_string())],
        }
    }

    /// Textual form of the first `len` steps.
    pub fn prefix_text(&self, len: usize) -> String {
        render(&self.steps[..len.min(self.steps.len())])
    }

    /// Textual form of every prefix, shortest first. Each one extends the
    /// previous, so this is linear in the length of the path.
    pub fn prefix_texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut text = texts.last().cloned().unwrap_or_default();
            text.push_str(&step.to_string());
            texts.push(text);
        }
        texts
    }
}

fn render(steps: &[Step]) -> String {
    let mut s = String::new();
    for step in steps {
        s.push_str(&step.to_string());
    }
    s
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&render(&self.steps))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        }
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.text.len())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn ident(&mut self) -> Result<String, PathError> {
        let start = self.offset();
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos += 1;
        }
        let end = self.offset();
        if start == end {
            return Err(PathError::EmptySegment {
                path: self.text.to_string(),
                offset: start,
            });
        }
        Ok(self.text[start..end].to_string())
    }

    fn bracket(&mut self) -> Result<Step, PathError> {
        let open = self.offset();
        // Skip '['.
        self.pos += 1;
        let step = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.offset();
                while matches!(self.peek(), Some(c) if c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(PathError::Unterminated {
                        path: self.text.to_string(),
                        offset: start - 1,
                        delimiter: quote,
                    });
                }
                let attr = self.text[start..self.offset()].to_string();
                self.pos += 1;
                if attr.is_empty() {
                    return Err(PathError::EmptySegment {
                        path: self.text.to_string(),
                        offset: start,
                    });
                }
                Step::Attr(attr)
            }
            _ => {
                let start = self.offset();
                while matches!(self.peek(), Some(c) if c != ']') {
                    self.pos += 1;
                }
                let index = self.text[start..self.offset()].trim();
                if self.peek().is_none() {
                    return Err(PathError::Unterminated {
                        path: self.text.to_string(),
                        offset: open,
                        delimiter: '[',
                    });
                }
                match index.parse::<usize>() {
                    Ok(i) => Step::Index(i),
                    Err(_) => {
                        return Err(PathError::InvalidIndex {
                            path: self.text.to_string(),
                            index: index.to_string(),
                        })
                    }
                }
            }
        };

        if self.peek() != Some(']') {
            return Err(PathError::Unterminated {
                path: self.text.to_string(),
                offset: open,
                delimiter: '[',
            });
        }
        self.pos += 1;
        Ok(step)
    }

    fn parse(mut self) -> Result<Path, PathError> {
        if self.text.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let mut steps = vec![Step::Root(self.ident()?)];
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    steps.push(Step::Attr(self.ident()?));
                }
                '[' => steps.push(self.bracket()?),
                ch => {
                    return Err(PathError::UnexpectedChar {
                        path: self.text.to_string(),
                        offset: self.offset(),
                        ch,
                    })
                }
            }
        }

        Ok(Path { steps })
    }
}

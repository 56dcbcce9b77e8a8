//! Canonical type references.
//!
//! A [`TypeDescriptor`] is the value the front-end hands over for every typed
//! entity: field and variable types, argument and result types, template type
//! arguments. It is compared structurally and never mutated after construction;
//! the builder-style methods consume `self` and return a new descriptor.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CompactString, compact_string};

bitflags! {
    /// cv-qualifiers applied at one level of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Qualifiers: u8 {
        const CONST    = 0b0000_0001;
        const VOLATILE = 0b0000_0010;
    }
}

impl Qualifiers {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "const" => Some(Qualifiers::CONST),
            "volatile" => Some(Qualifiers::VOLATILE),
            _ => None,
        }
    }

    fn spelling(&self) -> String {
        let mut words = Vec::with_capacity(2);
        if self.contains(Qualifiers::CONST) {
            words.push("const");
        }
        if self.contains(Qualifiers::VOLATILE) {
            words.push("volatile");
        }
        words.join(" ")
    }
}

/// Structural description of a type reference.
///
/// `qualifiers` apply to the base type; `pointers` holds one qualifier set per
/// pointer level, innermost first, so `int const * const` is
/// `base = "int", qualifiers = CONST, pointers = [CONST]`.
///
/// Array extents are listed outermost first. `0` is an omitted extent (`[]`)
/// and [`TypeDescriptor::UNKNOWN_EXTENT`] one that is not an integral constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    base: CompactString,
    #[serde(default)]
    qualifiers: Qualifiers,
    #[serde(default)]
    pointers: Vec<Qualifiers>,
    #[serde(default)]
    is_reference: bool,
    #[serde(default)]
    array_dims: Vec<u64>,
}

impl TypeDescriptor {
    /// Extent written as an expression the front-end could not evaluate.
    pub const UNKNOWN_EXTENT: u64 = u64::MAX;

    pub fn named(base: &str) -> Self {
        Self {
            base: compact_string(base.trim()),
            qualifiers: Qualifiers::empty(),
            pointers: Vec::new(),
            is_reference: false,
            array_dims: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers |= qualifiers;
        self
    }

    /// Wraps the current type in one more pointer level.
    #[must_use]
    pub fn pointer(mut self, qualifiers: Qualifiers) -> Self {
        self.pointers.push(qualifiers);
        self
    }

    #[must_use]
    pub fn reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    #[must_use]
    pub fn array(mut self, dims: &[u64]) -> Self {
        self.array_dims.extend_from_slice(dims);
        self
    }

    /// Same shape over a different base type.
    #[must_use]
    pub fn rebased(&self, base: &str) -> Self {
        Self {
            base: compact_string(base.trim()),
            ..self.clone()
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn qualifiers(&self) -> Qualifiers {
        self.qualifiers
    }

    pub fn pointer_depth(&self) -> usize {
        self.pointers.len()
    }

    pub fn pointer_qualifiers(&self) -> &[Qualifiers] {
        &self.pointers
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn is_pointer(&self) -> bool {
        !self.pointers.is_empty()
    }

    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    pub fn array_dimensions(&self) -> &[u64] {
        &self.array_dims
    }

    /// Product of all array extents; 1 for non-arrays. `None` when an extent
    /// is unknown or the product does not fit in `u64`.
    pub fn element_count(&self) -> Option<u64> {
        self.array_dims.iter().try_fold(1u64, |count, &dim| {
            if dim == Self::UNKNOWN_EXTENT {
                None
            } else {
                count.checked_mul(dim)
            }
        })
    }

    pub fn has_unknown_extent(&self) -> bool {
        self.array_dims.contains(&Self::UNKNOWN_EXTENT)
    }

    /// Qualifiers of the object itself (outermost pointer, or the base).
    pub fn top_level_qualifiers(&self) -> Qualifiers {
        match self.pointers.last() {
            Some(qualifiers) => *qualifiers,
            None => self.qualifiers,
        }
    }

    pub fn is_const(&self) -> bool {
        self.top_level_qualifiers().contains(Qualifiers::CONST)
    }

    pub fn is_volatile(&self) -> bool {
        self.top_level_qualifiers().contains(Qualifiers::VOLATILE)
    }

    /// Same type with top-level cv-qualifiers dropped, as used for
    /// function parameter identity.
    #[must_use]
    pub fn without_top_level_qualifiers(&self) -> Self {
        let mut stripped = self.clone();
        if stripped.is_reference || stripped.is_array() {
            return stripped;
        }
        match stripped.pointers.last_mut() {
            Some(qualifiers) => *qualifiers = Qualifiers::empty(),
            None => stripped.qualifiers = Qualifiers::empty(),
        }
        stripped
    }

    pub fn is_void(&self) -> bool {
        &*self.base == "void" && self.pointers.is_empty() && !self.is_array()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.qualifiers.is_empty() {
            write!(f, "{} ", self.qualifiers.spelling())?;
        }
        f.write_str(&self.base)?;

        if !self.pointers.is_empty() {
            f.write_str(" ")?;
            for (i, qualifiers) in self.pointers.iter().enumerate() {
                f.write_str("*")?;
                if !qualifiers.is_empty() {
                    f.write_str(&qualifiers.spelling())?;
                    if i + 1 < self.pointers.len() {
                        f.write_str(" ")?;
                    }
                }
            }
        }

        if self.is_reference {
            if self.pointers.is_empty() {
                f.write_str(" &")?;
            } else {
                f.write_str("&")?;
            }
        }

        if !self.array_dims.is_empty() {
            f.write_str(" ")?;
            for dim in &self.array_dims {
                match *dim {
                    0 => f.write_str("[]")?,
                    Self::UNKNOWN_EXTENT => f.write_str("[?]")?,
                    dim => write!(f, "[{dim}]")?,
                }
            }
        }
        Ok(())
    }
}

/// Error returned when a type spelling cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid type spelling '{spelling}': {reason}")]
pub struct TypeSpellingError {
    pub spelling: String,
    pub reason: &'static str,
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Star,
    Amp,
}

fn tokenize(spelling: &str) -> Vec<Token<'_>> {
    let bytes = spelling.as_bytes();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' | b'(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            b'>' | b')' => {
                depth = depth.saturating_sub(1);
                start.get_or_insert(i);
            }
            _ if depth > 0 => {
                start.get_or_insert(i);
            }
            b'*' | b'&' | b' ' | b'\t' | b'\n' => {
                if let Some(s) = start.take() {
                    tokens.push(Token::Word(&spelling[s..i]));
                }
                match b {
                    b'*' => tokens.push(Token::Star),
                    b'&' => {
                        if tokens.last() != Some(&Token::Amp) {
                            tokens.push(Token::Amp);
                        }
                    }
                    _ => {}
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Word(&spelling[s..]));
    }
    tokens
}

fn split_array_suffix(spelling: &str) -> Result<(&str, Vec<u64>), TypeSpellingError> {
    let invalid = |reason| TypeSpellingError {
        spelling: spelling.to_string(),
        reason,
    };

    // Brackets inside template argument lists belong to the base name.
    let mut depth = 0usize;
    let mut bracket = None;
    for (i, c) in spelling.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            '[' if depth == 0 => {
                bracket = Some(i);
                break;
            }
            _ => {}
        }
    }
    let Some(open) = bracket else {
        return Ok((spelling, Vec::new()));
    };

    let mut dims = Vec::new();
    let mut rest = spelling[open..].trim();
    while let Some(inner) = rest.strip_prefix('[') {
        let close = inner.find(']').ok_or_else(|| invalid("unterminated array extent"))?;
        let extent = inner[..close].trim();
        let dim = match extent {
            "" => 0,
            "?" => TypeDescriptor::UNKNOWN_EXTENT,
            _ => extent
                .parse::<u64>()
                .ok()
                .filter(|dim| *dim != TypeDescriptor::UNKNOWN_EXTENT)
                .ok_or_else(|| invalid("array extent is not an integer"))?,
        };
        dims.push(dim);
        rest = inner[close + 1..].trim_start();
    }
    if !rest.is_empty() {
        return Err(invalid("unexpected text after array extent"));
    }
    Ok((&spelling[..open], dims))
}

impl FromStr for TypeDescriptor {
    type Err = TypeSpellingError;

    fn from_str(spelling: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| TypeSpellingError {
            spelling: spelling.to_string(),
            reason,
        };

        let (head, dims) = split_array_suffix(spelling.trim())?;
        let mut base_words: Vec<&str> = Vec::new();
        let mut qualifiers = Qualifiers::empty();
        let mut pointers: Vec<Qualifiers> = Vec::new();
        let mut is_reference = false;

        for token in tokenize(head) {
            match token {
                Token::Word(word) => {
                    if is_reference {
                        return Err(invalid("text after reference declarator"));
                    }
                    match (Qualifiers::from_keyword(word), pointers.last_mut()) {
                        (Some(q), Some(level)) => *level |= q,
                        (Some(q), None) => qualifiers |= q,
                        (None, Some(_)) => return Err(invalid("type name after pointer")),
                        (None, None) => base_words.push(word),
                    }
                }
                Token::Star => {
                    if base_words.is_empty() {
                        return Err(invalid("pointer without a base type"));
                    }
                    pointers.push(Qualifiers::empty());
                }
                Token::Amp => is_reference = true,
            }
        }

        if base_words.is_empty() {
            return Err(invalid("missing base type"));
        }

        Ok(Self {
            base: compact_string(&base_words.join(" ")),
            qualifiers,
            pointers,
            is_reference,
            array_dims: dims,
        })
    }
}

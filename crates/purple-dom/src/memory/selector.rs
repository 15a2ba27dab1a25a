#![forbid(unsafe_code)]

//! A small CSS selector engine for [`MemoryDom`](super::MemoryDom).
//!
//! Supported grammar: selector lists (`,`), descendant and child (`>`)
//! combinators, type and universal selectors, `#id`, `.class`, and attribute
//! selectors with `=`, `^=`, `$=`, `*=` and `~=`. Pseudo-classes are
//! rejected; the browser backend handles the full language.
//!
//! Tokenizing is left to `cssparser`, so comments and escapes behave as
//! they do in a browser.

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::DomError;

/// Read-only view of an element tree the matcher walks.
pub(crate) trait SelectorTree {
    type Id: Copy;

    fn parent_of(&self, id: Self::Id) -> Option<Self::Id>;
    fn name_of(&self, id: Self::Id) -> &str;
    fn attribute_of(&self, id: Self::Id, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Contains,
    Includes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrMatch {
    fn accepts(&self, actual: &str) -> bool {
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Includes => actual.split_ascii_whitespace().any(|w| w == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    name: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches<T: SelectorTree>(&self, tree: &T, id: T::Id) -> bool {
        if let Some(name) = &self.name
            && !tree.name_of(id).eq_ignore_ascii_case(name)
        {
            return false;
        }
        if let Some(want) = &self.id
            && tree.attribute_of(id, "id") != Some(want.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = tree.attribute_of(id, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|c| classes.split_ascii_whitespace().any(|have| have == c))
            {
                return false;
            }
        }
        self.attrs.iter().all(|attr| {
            tree.attribute_of(id, &attr.name)
                .is_some_and(|actual| attr.accepts(actual))
        })
    }
}

/// One complex selector, stored left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Compound>,
    /// `combinators[i]` joins `parts[i]` and `parts[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches<T: SelectorTree>(&self, tree: &T, id: T::Id) -> bool {
        self.matches_from(tree, id, self.parts.len() - 1)
    }

    fn matches_from<T: SelectorTree>(&self, tree: &T, id: T::Id, idx: usize) -> bool {
        if !self.parts[idx].matches(tree, id) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent_of(id)
                .is_some_and(|parent| self.matches_from(tree, parent, idx - 1)),
            Combinator::Descendant => {
                let mut cursor = tree.parent_of(id);
                while let Some(ancestor) = cursor {
                    if self.matches_from(tree, ancestor, idx - 1) {
                        return true;
                    }
                    cursor = tree.parent_of(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub(crate) fn parse(source: &str) -> Result<Self, DomError> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_entirely(|p| p.parse_comma_separated(parse_complex))
            .map(|selectors| Self { selectors })
            .map_err(|_| DomError::InvalidSelector(source.to_owned()))
    }

    pub(crate) fn matches<T: SelectorTree>(&self, tree: &T, id: T::Id) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, id))
    }
}

type SelectorError<'i> = ParseError<'i, ()>;

fn invalid<'i>(input: &Parser<'i, '_>) -> SelectorError<'i> {
    input.new_custom_error::<(), ()>(())
}

fn parse_complex<'i>(input: &mut Parser<'i, '_>) -> Result<Complex, SelectorError<'i>> {
    input.skip_whitespace();
    let mut parts = vec![parse_compound(input)?];
    let mut combinators = Vec::new();
    loop {
        let mut combinator = None;
        loop {
            let state = input.state();
            match input.next_including_whitespace().cloned() {
                Err(_) if combinator != Some(Combinator::Child) => {
                    return Ok(Complex { parts, combinators });
                }
                Err(err) => return Err(err.into()),
                Ok(Token::WhiteSpace(_)) => {
                    combinator.get_or_insert(Combinator::Descendant);
                }
                Ok(Token::Delim('>')) if combinator != Some(Combinator::Child) => {
                    combinator = Some(Combinator::Child);
                }
                Ok(_) => {
                    input.reset(&state);
                    break;
                }
            }
        }
        let Some(combinator) = combinator else {
            return Err(invalid(input));
        };
        combinators.push(combinator);
        parts.push(parse_compound(input)?);
    }
}

fn parse_compound<'i>(input: &mut Parser<'i, '_>) -> Result<Compound, SelectorError<'i>> {
    let mut compound = Compound::default();
    let mut empty = true;
    loop {
        let state = input.state();
        let Ok(token) = input.next_including_whitespace().cloned() else {
            break;
        };
        match token {
            Token::Ident(name) if empty => compound.name = Some(name.to_ascii_lowercase()),
            Token::Delim('*') if empty => {}
            Token::IDHash(id) => compound.id = Some(id.as_ref().to_owned()),
            Token::Delim('.') => match input.next_including_whitespace()?.clone() {
                Token::Ident(class) => compound.classes.push(class.as_ref().to_owned()),
                token => return Err(input.new_unexpected_token_error(token)),
            },
            Token::SquareBracketBlock => {
                let attr = input.parse_nested_block(parse_attribute)?;
                compound.attrs.push(attr);
            }
            _ => {
                input.reset(&state);
                break;
            }
        }
        empty = false;
    }
    if empty {
        return Err(invalid(input));
    }
    Ok(compound)
}

/// Body of `[...]`, brackets already consumed.
fn parse_attribute<'i>(input: &mut Parser<'i, '_>) -> Result<AttrMatch, SelectorError<'i>> {
    let name = input.expect_ident()?.as_ref().to_owned();
    if input.is_exhausted() {
        return Ok(AttrMatch {
            name,
            op: AttrOp::Exists,
            value: String::new(),
        });
    }
    let op = match input.next()?.clone() {
        Token::Delim('=') => AttrOp::Equals,
        Token::PrefixMatch => AttrOp::Prefix,
        Token::SuffixMatch => AttrOp::Suffix,
        Token::SubstringMatch => AttrOp::Contains,
        Token::IncludeMatch => AttrOp::Includes,
        token => return Err(input.new_unexpected_token_error(token)),
    };
    let value = input.expect_ident_or_string()?.as_ref().to_owned();
    Ok(AttrMatch { name, op, value })
}

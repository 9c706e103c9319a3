//! Compact schema notation
//!
//! A flat token stream is grouped greedily into `(name, example, [required],
//! [variadic])` tuples. Grouping never fails: malformed tuples are dropped and
//! the structural check on the resulting schema catches what it can.

use super::{Example, Param};
use crate::value::Value;

/// One token of the notation
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Str(String),
    Bool(bool),
    Other(Example),
}

impl Token {
    fn into_example(self) -> Example {
        match self {
            Token::Str(s) => Example::Value(Value::Str(s)),
            Token::Bool(b) => Example::Value(Value::Bool(b)),
            Token::Other(example) => example,
        }
    }
}

impl From<Example> for Token {
    fn from(example: Example) -> Self {
        match example {
            Example::Value(Value::Str(s)) => Token::Str(s),
            Example::Value(Value::Bool(b)) => Token::Bool(b),
            other => Token::Other(other),
        }
    }
}

/// Position inside the tuple being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Name,
    Example,
    Required,
    Variadic,
}

/// Groups `tokens` into params.
///
/// - a string names a new param unless an example is awaited, in which case
///   it is the example
/// - any token in the example slot appends the param
/// - a bool after the example sets `required`, a second bool sets `variadic`
///   (`true` clears `required`)
/// - a bool where a name is expected discards the tuple and everything up to
///   the next string
/// - a name left without an example at the end is dropped
pub fn params(tokens: impl IntoIterator<Item = Token>) -> Vec<Param> {
    let mut out: Vec<Param> = Vec::new();
    let mut slot = Slot::Name;
    let mut name = String::new();
    let mut skip_until_name = false;

    for token in tokens {
        match token {
            Token::Str(s) if slot != Slot::Example => {
                // A name where a flag could go closes the previous tuple
                skip_until_name = false;
                name = s;
                slot = Slot::Example;
            }
            Token::Bool(flag) if !skip_until_name => match slot {
                Slot::Example => {
                    out.push(Param::optional(std::mem::take(&mut name), Token::Bool(flag).into_example()));
                    slot = Slot::Required;
                }
                Slot::Required => {
                    if let Some(last) = out.last_mut() {
                        last.required = flag;
                    }
                    slot = Slot::Variadic;
                }
                Slot::Variadic => {
                    if let Some(last) = out.last_mut() {
                        last.variadic = flag;
                        if flag {
                            last.required = false;
                        }
                    }
                    slot = Slot::Name;
                }
                Slot::Name => {
                    tracing::trace!("bool where a param name was expected, skipping to the next name");
                    skip_until_name = true;
                    name.clear();
                }
            },
            token if !skip_until_name && slot == Slot::Example => {
                out.push(Param::optional(std::mem::take(&mut name), token.into_example()));
                slot = Slot::Required;
            }
            _ => {}
        }
    }

    out
}

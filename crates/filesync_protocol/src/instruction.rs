//! Compact instruction grammar.
//!
//! An instruction is `verb:path` or `verb:path:newpath`, where `verb` is one
//! of `put`, `patch`, `delete`, `copy`, `move`. Paths may not contain `:`.

use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::{Operation, Verb};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = ':';

/// A parsed instruction, before any source content is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Requested mutation.
    pub verb: Verb,
    /// Target path, relative to the source root.
    pub path: String,
    /// Optional second path.
    pub new_path: Option<String>,
}

impl Instruction {
    /// Parses an instruction string.
    pub fn parse(value: &str) -> ProtocolResult<Self> {
        if value.is_empty() {
            return Err(ProtocolError::EmptyInstruction);
        }

        let parts: Vec<&str> = value.split(SEPARATOR).collect();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
            return Err(ProtocolError::MalformedInstruction(value.to_string()));
        }

        let verb = parts[0].parse::<Verb>()?;

        Ok(Self {
            verb,
            path: parts[1].to_string(),
            new_path: parts.get(2).map(|p| (*p).to_string()),
        })
    }

    /// Converts into an operation without content.
    pub fn into_operation(self) -> Operation {
        let mut operation = Operation::new(self.verb, self.path);
        operation.new_path = self.new_path;
        operation
    }
}

impl FromStr for Instruction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.verb, self.path)?;
        if let Some(new_path) = &self.new_path {
            write!(f, "{SEPARATOR}{new_path}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_two_part() {
        let instruction: Instruction = "put:tests/test.txt".parse().unwrap();
        assert_eq!(instruction.verb, Verb::Put);
        assert_eq!(instruction.path, "tests/test.txt");
        assert_eq!(instruction.new_path, None);
    }

    #[test]
    fn parse_three_part() {
        let instruction = Instruction::parse("move:a/b.txt:c/d.txt").unwrap();
        assert_eq!(instruction.verb, Verb::Move);
        assert_eq!(instruction.path, "a/b.txt");
        assert_eq!(instruction.new_path.as_deref(), Some("c/d.txt"));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Instruction::parse(""),
            Err(ProtocolError::EmptyInstruction)
        ));
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(matches!(
            Instruction::parse("chmod:a.txt"),
            Err(ProtocolError::UnknownVerb(v)) if v == "chmod"
        ));
    }

    #[test]
    fn rejects_malformed() {
        for value in ["put", "put:", ":a.txt", "copy:a::", "copy:a:b:c", "delete::b"] {
            assert!(
                matches!(
                    Instruction::parse(value),
                    Err(ProtocolError::MalformedInstruction(_))
                ),
                "{value} should be malformed"
            );
        }
    }

    #[test]
    fn into_operation_keeps_paths() {
        let op = Instruction::parse("copy:a.txt:b.txt")
            .unwrap()
            .into_operation();
        assert_eq!(op.verb, Verb::Copy);
        assert_eq!(op.path, "a.txt");
        assert_eq!(op.new_path.as_deref(), Some("b.txt"));
        assert!(op.content_base64.is_none());
    }

    fn verb_strategy() -> impl Strategy<Value = Verb> {
        prop::sample::select(Verb::ALL.to_vec())
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9_.-]{1,12}(/[a-zA-Z0-9_.-]{1,12}){0,3}")
            .expect("valid regex")
    }

    proptest! {
        #[test]
        fn round_trips_losslessly(
            verb in verb_strategy(),
            path in path_strategy(),
            new_path in prop::option::of(path_strategy()),
        ) {
            let text = match &new_path {
                Some(new_path) => format!("{verb}:{path}:{new_path}"),
                None => format!("{verb}:{path}"),
            };

            let parsed = Instruction::parse(&text).unwrap();
            prop_assert_eq!(parsed.verb, verb);
            prop_assert_eq!(&parsed.path, &path);
            prop_assert_eq!(&parsed.new_path, &new_path);
            prop_assert_eq!(parsed.to_string(), text);
        }
    }
}

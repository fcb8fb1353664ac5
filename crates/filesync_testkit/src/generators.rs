//! Property-based test generators using proptest.

use filesync_protocol::{Instruction, Operation, Verb};
use proptest::prelude::*;

/// Strategy for any verb.
pub fn verb_strategy() -> impl Strategy<Value = Verb> {
    prop::sample::select(Verb::ALL.to_vec())
}

/// Strategy for relative paths that stay inside their root.
pub fn relative_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_-]{1,12}(/[a-zA-Z0-9_-]{1,12}){0,3}(\\.[a-z]{1,4})?")
        .expect("Invalid regex")
}

/// Strategy for grammatical instructions; copy and move always get a
/// second path.
pub fn instruction_strategy() -> impl Strategy<Value = Instruction> {
    (verb_strategy(), relative_path_strategy(), relative_path_strategy()).prop_map(
        |(verb, path, new_path)| Instruction {
            verb,
            new_path: verb.requires_new_path().then_some(new_path),
            path,
        },
    )
}

/// Strategy for operations with content and retry history.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    (
        instruction_strategy(),
        prop::collection::vec(any::<u8>(), 1..256),
        0u32..10,
        any::<bool>(),
    )
        .prop_map(|(instruction, content, retry_count, force)| {
            let verb = instruction.verb;
            let mut operation = instruction.into_operation().with_force(force);
            if verb.requires_content() {
                operation = operation.with_content(&content);
            }
            operation.retry_count = retry_count;
            operation
        })
}

//! # Patch Engine
//!
//! Applies an ordered sequence of [`PatchOp`]s to a JSON value with
//! `json-patch`. Operations run strictly in order, each against the
//! cumulative result of the previous ones, on a private working copy. The
//! caller's value is never touched and a failure anywhere discards the
//! working copy, so application is all or nothing.
//!
//! Each operation is handed to `json-patch` on its own so a failure names the
//! operation's position in the change list. A `move` whose `from` equals its
//! `path` only checks that the location exists.
//!
//! ## Idempotence
//!
//! `replace` and `test` are idempotent: reapplying them to their own output
//! yields the same output. `add` is not in general. Adding into a sequence
//! inserts a second element every time it runs, and adding to an existing
//! mapping key overwrites whatever value is there, so reapplying an `add`
//! after another operation changed that key produces a different document.
//! `remove`, `move`, and `copy` are not idempotent either since their source
//! or target changes after the first run.
//!
//! Removing a mapping key moves the table's last key into the freed slot.

use json_patch::{MoveOperation, PatchErrorKind, PatchOperation};
use rpcl_types::{PatchOp, op_name, op_path};
use serde_json::Value;

use crate::error::PatchError;

/// Applies `ops` to a copy of `document` and returns the patched copy.
pub fn apply(document: &Value, ops: &[PatchOp]) -> Result<Value, PatchError> {
    apply_owned(document.clone(), ops)
}

/// Applies a whole patch, consuming the input value.
pub fn apply_owned(document: Value, ops: &[PatchOp]) -> Result<Value, PatchError> {
    let mut working = document;
    for (index, op) in ops.iter().enumerate() {
        apply_op(&mut working, op, index)?;
    }
    Ok(working)
}

fn apply_op(document: &mut Value, op: &PatchOp, index: usize) -> Result<(), PatchError> {
    if let PatchOperation::Move(MoveOperation { from, path }) = op
        && from == path
    {
        let from = from.to_string();
        return match document.pointer(&from) {
            Some(_) => Ok(()),
            None => Err(PatchError::PathNotFound { index, op: "move", path: from }),
        };
    }

    json_patch::patch(document, std::slice::from_ref(op)).map_err(|error| match error.kind {
        PatchErrorKind::TestFailed => test_failed(document, op, index),
        PatchErrorKind::CannotMoveInsideItself => match op {
            PatchOperation::Move(MoveOperation { from, path }) => PatchError::InvalidMove {
                index,
                from: from.to_string(),
                path: path.to_string(),
            },
            other => not_found(other, index),
        },
        _ => not_found(op, index),
    })
}

fn not_found(op: &PatchOp, index: usize) -> PatchError {
    let path = match op {
        PatchOperation::Move(MoveOperation { from, .. }) => from.to_string(),
        PatchOperation::Copy(copy) => copy.from.to_string(),
        other => op_path(other),
    };
    PatchError::PathNotFound { index, op: op_name(op), path }
}

fn test_failed(document: &Value, op: &PatchOp, index: usize) -> PatchError {
    let path = op_path(op);
    let expected = match op {
        PatchOperation::Test(test) => test.value.clone(),
        _ => Value::Null,
    };
    PatchError::TestFailed {
        index,
        actual: document.pointer(&path).cloned().unwrap_or_default(),
        expected,
        path,
    }
}

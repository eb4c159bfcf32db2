//! Patch operations carried by extension lists.
//!
//! Operations are RFC 6902 JSON Patch operations from the `json-patch` crate.
//! Their pointers are checked when the change list is deserialized, so a
//! malformed path or an unknown `op` never reaches the patch engine.

use json_patch::PatchOperation;

/// A single edit addressed by JSON Pointer.
pub type PatchOp = PatchOperation;

/// Ordered sequence of operations; each applies to the result of the previous.
pub type Patch = Vec<PatchOp>;

/// Operation name as it appears in the `op` field.
pub fn op_name(op: &PatchOp) -> &'static str {
    match op {
        PatchOperation::Add(_) => "add",
        PatchOperation::Remove(_) => "remove",
        PatchOperation::Replace(_) => "replace",
        PatchOperation::Move(_) => "move",
        PatchOperation::Copy(_) => "copy",
        PatchOperation::Test(_) => "test",
    }
}

/// Target location of the operation, as pointer text.
pub fn op_path(op: &PatchOp) -> String {
    match op {
        PatchOperation::Add(op) => op.path.to_string(),
        PatchOperation::Remove(op) => op.path.to_string(),
        PatchOperation::Replace(op) => op.path.to_string(),
        PatchOperation::Move(op) => op.path.to_string(),
        PatchOperation::Copy(op) => op.path.to_string(),
        PatchOperation::Test(op) => op.path.to_string(),
    }
}

//! Error types shared across the editor core.

use crate::doc::ObjectId;

/// Errors raised by hierarchy (treeview) mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The dragged object does not exist.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The drop target does not exist.
    #[error("unknown drop target: {0}")]
    UnknownTarget(ObjectId),
    /// An object was dropped onto itself.
    #[error("cannot drop {0} onto itself")]
    SelfDrop(ObjectId),
    /// The move would make `node` a descendant of itself.
    #[error("moving {node} under {target} would create a cycle")]
    Cycle { node: ObjectId, target: ObjectId },
    /// Only folders and the scene root accept children.
    #[error("{0} cannot contain children")]
    NotAContainer(ObjectId),
}

/// Errors returned by the file-storage boundary client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The request could not be sent or the body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success HTTP status.
    #[error("storage request failed: HTTP {0}")]
    Status(u16),
    /// The endpoint answered `success: false`.
    #[error("{0}")]
    Rejected(String),
    /// The envelope reported success but carried no payload.
    #[error("storage response for `{0}` carried no data")]
    MissingData(&'static str),
    /// The payload did not match the expected shape.
    #[error("failed to decode storage response: {0}")]
    Decode(String),
    /// A browser API threw while building the request.
    #[error("browser error: {0}")]
    Js(String),
}

/// Top-level error for editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Snapshot or document (de)serialization failed.
    #[error("scene serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    /// An operation referenced an object id not present in the document.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The operation requires exactly one selected object.
    #[error("operation requires exactly one selected object")]
    NotSingleSelection,
    /// The operation does not apply to this kind of object.
    #[error("object {id} does not support {operation}")]
    UnsupportedKind { id: ObjectId, operation: &'static str },
    /// A field value was rejected (wrong type or out of range).
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    /// A hierarchy mutation was rejected.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A storage boundary call failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Host configuration failed validation.
    #[error("invalid editor configuration: {0}")]
    InvalidConfig(String),
}

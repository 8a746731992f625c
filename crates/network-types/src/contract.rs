//! Per-method type contracts.
//!
//! A [TypeContract] describes how a method's payload is serialized and deserialized and the
//! bounds of its serialized length. Contracts are collected in a read-only [ContractRegistry]
//! that is shared by every stream.

use crate::Method;
use std::{collections::HashMap, fmt};
use thiserror::Error;

/// Errors raised by a type contract's serialize or deserialize functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The value passed to serialize does not belong to the contract's method.
    #[error("{method} contract cannot serialize {found} body")]
    BodyMismatch {
        /// The contract's method.
        method: Method,
        /// The name of the value's variant.
        found: &'static str,
    },
    /// The bytes are not a valid SSZ encoding of the method's type.
    #[error("ssz decode error: {0}")]
    Ssz(String),
}

impl From<ssz::DecodeError> for ContractError {
    fn from(e: ssz::DecodeError) -> Self {
        // ssz errors only impl Debug
        Self::Ssz(format!("{e:?}"))
    }
}

/// Serialize a value into SSZ bytes.
pub type SerializeFn<T> = fn(&T) -> Result<Vec<u8>, ContractError>;

/// Deserialize SSZ bytes into a value.
pub type DeserializeFn<T> = fn(&[u8]) -> Result<T, ContractError>;

/// The serialize/deserialize functions and serialized length bounds for one method.
pub struct TypeContract<T> {
    /// The minimum serialized length in bytes.
    min_size: usize,
    /// The maximum serialized length in bytes.
    max_size: usize,
    /// How the payload is (de)serialized.
    body: ContractBody<T>,
}

enum ContractBody<T> {
    /// The method carries no bytes. Decoding produces the default value without reading.
    Empty(fn() -> T),
    /// SSZ payload.
    Ssz { serialize: SerializeFn<T>, deserialize: DeserializeFn<T> },
}

impl<T> TypeContract<T> {
    /// Create a contract for an SSZ payload with the given length bounds.
    pub fn ssz(
        min_size: usize,
        max_size: usize,
        serialize: SerializeFn<T>,
        deserialize: DeserializeFn<T>,
    ) -> Self {
        debug_assert!(min_size <= max_size);
        Self { min_size, max_size, body: ContractBody::Ssz { serialize, deserialize } }
    }

    /// Create a contract for a method without a body.
    pub fn empty(default: fn() -> T) -> Self {
        Self { min_size: 0, max_size: 0, body: ContractBody::Empty(default) }
    }

    /// The minimum serialized length in bytes.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// The maximum serialized length in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The value produced for methods without a body.
    ///
    /// Returns `None` for methods that carry a payload.
    pub fn empty_body(&self) -> Option<T> {
        match self.body {
            ContractBody::Empty(default) => Some(default()),
            ContractBody::Ssz { .. } => None,
        }
    }

    /// Serialize the value.
    ///
    /// Methods without a body serialize to zero bytes.
    pub fn serialize(&self, value: &T) -> Result<Vec<u8>, ContractError> {
        match self.body {
            ContractBody::Empty(_) => Ok(Vec::new()),
            ContractBody::Ssz { serialize, .. } => serialize(value),
        }
    }

    /// Deserialize the bytes.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<T, ContractError> {
        match self.body {
            ContractBody::Empty(default) => Ok(default()),
            ContractBody::Ssz { deserialize, .. } => deserialize(bytes),
        }
    }
}

// fn pointers are Copy regardless of `T`
impl<T> Clone for TypeContract<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypeContract<T> {}

impl<T> Clone for ContractBody<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContractBody<T> {}

impl<T> fmt::Debug for TypeContract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeContract")
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("empty", &matches!(self.body, ContractBody::Empty(_)))
            .finish()
    }
}

/// How the bytes following a complete payload are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Frames follow each other back to back. Bytes after a payload start the next frame.
    #[default]
    Pipelined,
    /// Bytes received with a payload must start a frame whose length prefix is within the
    /// method's bounds. Otherwise they were read past the end of the payload.
    Strict,
}

/// The lookup table of type contracts keyed by [Method].
#[derive(Debug)]
pub struct ContractRegistry<T> {
    contracts: HashMap<Method, TypeContract<T>>,
    framing: Framing,
}

impl<T> ContractRegistry<T> {
    /// Create an empty registry with pipelined framing.
    pub fn new() -> Self {
        Self { contracts: HashMap::new(), framing: Framing::default() }
    }

    /// Register the contract for a method, replacing any previous contract.
    pub fn with_contract(mut self, method: Method, contract: TypeContract<T>) -> Self {
        self.contracts.insert(method, contract);
        self
    }

    /// Set how frames on streams using this registry follow each other.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// The framing for streams using this registry.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Return the contract for a method.
    pub fn lookup(&self, method: Method) -> Option<TypeContract<T>> {
        self.contracts.get(&method).copied()
    }

    /// Whether the registry has a contract for the method.
    pub fn contains(&self, method: Method) -> bool {
        self.contracts.contains_key(&method)
    }
}

impl<T> Default for ContractRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience trait for payload types with a built-in contract registry.
pub trait WireMessage: Sized + Send + fmt::Debug + 'static {
    /// The registry shared by every stream carrying this type.
    fn contracts() -> &'static ContractRegistry<Self>;
}

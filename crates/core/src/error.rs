//! Error types for myelin
//!
//! Every operation returns a single [`Error`] value. Failures fall into two
//! classes (see [`ErrorClass`]):
//!
//! - **Warning**: an expected precondition failure (empty input, no match,
//!   duplicate found). Callers usually branch on these.
//! - **Issue**: an unexpected collaborator-level failure (I/O, bad result
//!   shape, lost race).
//!
//! Pipelines attach a note for every step that fails, so an error read from
//! the outside looks like `failed editing document: document test before
//! edit: no document matched the query`. Use [`ResultExt::remind`] to add a
//! note and [`Error::notes`] / [`Error::root`] to take the chain apart.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for myelin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure class of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Expected, recoverable precondition failure
    Warning,
    /// Unexpected collaborator-level failure
    Issue,
}

/// Error types for myelin
#[derive(Debug, Error)]
pub enum Error {
    /// Factor set was empty where identity generation needs at least one factor
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Caller supplied a value of the wrong shape
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Query carried no conditions where one is required
    #[error("empty query")]
    EmptyQuery,

    /// Data payload was empty where one is required
    #[error("empty data")]
    EmptyData,

    /// Sort read was requested without a sort key
    #[error("empty sort")]
    EmptySort,

    /// No record matched the query
    #[error("no document matched the query")]
    NotFound,

    /// Query resolved to more records than the operation allows
    #[error("query matched {count} documents, expected exactly one")]
    Ambiguous {
        /// Number of matching records
        count: u64,
    },

    /// An identity field collided with an existing record
    #[error("document {field} duplicate")]
    Duplicate {
        /// Identity field that collided (`hash`, `reference`, `stamp`)
        field: &'static str,
    },

    /// Element already present in its array field
    #[error("element already exists in '{field}'")]
    ElementDuplicate {
        /// Array field name
        field: String,
    },

    /// Element not present in its array field
    #[error("element does not exist in '{field}'")]
    ElementMissing {
        /// Array field name
        field: String,
    },

    /// Partition requested over an empty collection
    #[error("count is zero")]
    ZeroCount,

    /// Stamp generation kept colliding past the attempt ceiling
    #[error("identity exhausted after {attempts} stamp attempts")]
    IdentityExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// Concurrent modification detected at the store boundary
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence collaborator failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Collaborator returned a result of an unexpected shape
    #[error("unexpected result: {0}")]
    Unexpected(String),

    /// Configuration could not be read, parsed or validated
    #[error("config error: {0}")]
    Config(String),

    /// One or more saves failed in a bulk resync
    #[error("{failed} of {total} documents failed to save")]
    Batch {
        /// Number of failed saves
        failed: usize,
        /// Number of attempted saves
        total: usize,
    },

    /// A step note wrapped around an underlying failure
    #[error("{note}: {source}")]
    Context {
        /// Human-readable step note
        note: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error in a step note
    pub fn remind(self, note: impl Into<String>) -> Self {
        Error::Context {
            note: note.into(),
            source: Box::new(self),
        }
    }

    /// Root cause with every context note peeled off
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Context notes, outermost first
    pub fn notes(&self) -> Vec<&str> {
        let mut notes = Vec::new();
        let mut current = self;
        while let Error::Context { note, source } = current {
            notes.push(note.as_str());
            current = source;
        }
        notes
    }

    /// Classify the root cause
    pub fn class(&self) -> ErrorClass {
        match self.root() {
            Error::EmptyInput(_)
            | Error::InvalidInput(_)
            | Error::EmptyQuery
            | Error::EmptyData
            | Error::EmptySort
            | Error::NotFound
            | Error::Ambiguous { .. }
            | Error::Duplicate { .. }
            | Error::ElementDuplicate { .. }
            | Error::ElementMissing { .. }
            | Error::ZeroCount
            | Error::IdentityExhausted { .. } => ErrorClass::Warning,
            Error::Conflict(_)
            | Error::Storage(_)
            | Error::Unexpected(_)
            | Error::Config(_)
            | Error::Batch { .. } => ErrorClass::Issue,
            Error::Context { source, .. } => source.class(),
        }
    }

    /// Check if this is an expected precondition failure
    pub fn is_warning(&self) -> bool {
        self.class() == ErrorClass::Warning
    }

    /// Check if this is a collaborator-level failure
    pub fn is_issue(&self) -> bool {
        self.class() == ErrorClass::Issue
    }

    /// Check if the root cause is `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound)
    }

    /// Check if the root cause is a duplicate of the given identity field
    pub fn is_duplicate_of(&self, field: &str) -> bool {
        matches!(self.root(), Error::Duplicate { field: f } if *f == field)
    }

    /// Build a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Build a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Unexpected(e.to_string())
    }
}

/// Attach step notes to a `Result`
pub trait ResultExt<T> {
    /// Wrap the error, if any, in a step note
    fn remind(self, note: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn remind(self, note: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.remind(note))
    }
}

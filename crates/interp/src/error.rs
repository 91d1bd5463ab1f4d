use crate::registry::{EntityKind, Handle};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The program could not be loaded.
    #[error(transparent)]
    Load(#[from] ssa::Error),

    /// The main package has no function with the configured entrypoint name.
    #[error("entrypoint {0} not found in main package")]
    EntryNotFound(String),

    /// No function of the program has the requested name.
    #[error("function {0} not found")]
    FunctionNotFound(String),

    /// The handle was never issued, or refers to an entity of another kind.
    #[error("invalid handle {handle}: expected {expected}")]
    InvalidHandle { handle: Handle, expected: EntityKind },

    /// The function has no instructions to enter.
    #[error("function {0} has no instructions")]
    EmptyFunction(String),

    /// A phi was reached from a block that does not precede it.
    #[error("block {last_block:?} is not a predecessor of block {block}")]
    UnknownPredecessor {
        last_block: Option<usize>,
        block: usize,
    },

    /// A register name without a numeric suffix cannot be reported to the host.
    #[error("register {0} has no numeric suffix")]
    RegisterName(String),

    /// The interpreted program panicked.
    #[error("panic: {0}")]
    TargetPanic(String),

    /// The interpreted program requested termination with an exit code.
    #[error("exit {0}")]
    Exit(i32),

    /// The interpreted program performed an invalid operation, such as a nil dereference.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The configuration is malformed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// An internal error occurred. This is a fatal error that cannot be safely handled.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl Error {
    /// Exit code of a fault recovered during execution.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Exit(code) => *code,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Not every unusual condition is an error. An assembly without the string cache field is simply
/// reported as clean by the locator, and a method with a malformed body is skipped and recorded in
/// the [`crate::deobfuscation::DeobfuscationResult`] instead of aborting the run.
///
/// # Error Categories
///
/// ## Method Body Errors
/// - [`Error::Malformed`] - An instruction sequence that does not match its opcodes
///
/// ## Container Errors
/// - [`Error::TypeNotFound`] - A type scheduled for cleanup is no longer in the module
/// - [`Error::FieldNotFound`] - The helper field vanished from its owning type
/// - [`Error::Serialization`] - The container backend failed to load or write a module
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Invocation Errors
/// - [`Error::InvalidInvocation`] - Required arguments are missing
///
/// # Examples
///
/// ```rust
/// use dotzion::{driver::Invocation, Error};
///
/// match Invocation::from_args(Vec::<String>::new()) {
///     Err(Error::InvalidInvocation(message)) => println!("{message}"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A method body could not be processed.
    ///
    /// Raised when an instruction's operand does not fit its opcode, e.g. an `ldstr` whose
    /// operand is not a resolved string literal. The error includes the source location where the
    /// malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to find a type in the module.
    ///
    /// The associated [`Token`] identifies which type was not found.
    #[error("Failed to find type in module - {0}")]
    TypeNotFound(Token),

    /// Failed to find a field on its owning type.
    ///
    /// The associated [`Token`] identifies which field was not found.
    #[error("Failed to find field in module - {0}")]
    FieldNotFound(Token),

    /// The tool was invoked without the arguments it requires.
    #[error("Invalid invocation - {0}")]
    InvalidInvocation(String),

    /// The container backend could not load or serialize a module.
    #[error("Serialization failed - {0}")]
    Serialization(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_carries_location() {
        let err = malformed_error!("ldstr at 0x{:04X} has no string operand", 0x10);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "ldstr at 0x0010 has no string operand");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_messages() {
        let err = Error::TypeNotFound(Token::new(0x02000003));
        assert_eq!(err.to_string(), "Failed to find type in module - 0x02000003");

        let err = Error::InvalidInvocation("unknown path".to_string());
        assert_eq!(err.to_string(), "Invalid invocation - unknown path");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::FileError(_)));
    }
}

//! Small internal helpers shared by the connection and protocol modules.

/// Returns early with `Err($error)` unless `$predicate` holds.
///
/// Reads like `assert!` but reports a protocol violation instead of panicking, which is what the
/// request assembler wants when the transport delivers events out of order.
///
/// ```ignore
/// ensure!(self.pending.is_none(), ParseError::UnexpectedHeader);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

use std::fmt;

macro_rules! err {
    ($kind:ident => $fmtstr:literal $(, $args:expr)* $(,)?) => {
        $crate::dex::error::DexError::with_kind($crate::dex::error::ErrorKind::$kind, &format!($fmtstr $(, $args)*))
    };
    ($fmtstr:literal $(, $args:expr)* $(,)?) => {
        $crate::dex::error::DexError::new(&format!($fmtstr $(, $args)*))
    };
}

#[macro_export]
macro_rules! fail {
    ($kind:ident => $fmtstr:literal $(, $args:expr)* $(,)?) => {
        return Err($crate::dex::error::DexError::with_kind(
            $crate::dex::error::ErrorKind::$kind,
            &format!($fmtstr $(, $args)*),
        ))
    };
    ($fmtstr:literal $(, $args:expr)* $(,)?) => {
        return Err($crate::dex::error::DexError::new(&format!($fmtstr $(, $args)*)))
    };
}

/// Broad category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{
    /// Structurally invalid input: bad header size, wrong chunk type, offsets outside their section.
    Format,
    /// Short read or a seek past the end of the buffer.
    Bounds,
    /// A LEB128 value does not fit in 64 bits.
    Overflow,
    /// A LEB128 value did not terminate within 10 bytes.
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexError
{
    kind: ErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn new(msg: &str) -> Self
    {
        DexError::with_kind(ErrorKind::Format, msg)
    }

    pub(crate) fn with_kind(kind: ErrorKind, msg: &str) -> Self
    {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn with_context(base: DexError, context: impl Into<String>) -> Self
    {
        let mut contexts = base.contexts;
        contexts.push(context.into());
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    pub fn kind(&self) -> ErrorKind
    {
        self.kind
    }

    /// The innermost message, without the context chain.
    pub fn message(&self) -> &str
    {
        &self.msg
    }

    /// Contexts from innermost to outermost.
    pub fn contexts(&self) -> &[String]
    {
        &self.contexts
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chain_display() {
        let e = DexError::with_kind(ErrorKind::Bounds, "Unexpected end of stream reading u4 at index 12");
        let e = DexError::with_context(e, "string id #3");
        let e = DexError::with_context(e, "string table");
        assert_eq!(
            e.to_string(),
            "Unexpected end of stream reading u4 at index 12 for string id #3 of string table"
        );
        assert_eq!(e.kind(), ErrorKind::Bounds);
        assert_eq!(e.contexts().len(), 2);
    }

    #[test]
    fn macros_build_errors() {
        fn failing(n: usize) -> Result<(), DexError> {
            fail!(Overflow => "value {} too large", n);
        }
        let e = failing(7).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Overflow);
        assert_eq!(e.message(), "value 7 too large");

        let e = err!("plain {}", 1);
        assert_eq!(e.kind(), ErrorKind::Format);
    }
}

//! External machine-translation collaborator seam.

use anyhow::Result;

/// One outbound translation call. Implementations live outside this crate;
/// the dictionary result path never blocks on or fails because of one.
pub trait Translator {
    /// Translate `text` into `target`, returning `None` when the service
    /// has no result. `source` is auto-detected when absent.
    fn translate(&self, text: &str, source: Option<&str>, target: &str)
    -> Result<Option<String>>;
}

/// Translator that never produces a result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTranslator;

impl Translator for NoTranslator {
    fn translate(
        &self,
        _text: &str,
        _source: Option<&str>,
        _target: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_translator() {
        let translator = NoTranslator;
        assert_eq!(translator.translate("cat", None, "ja").unwrap(), None);
    }
}

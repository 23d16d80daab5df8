//! Seam for the natural-language-to-command translator.
//!
//! Lines starting with `!` are forwarded here verbatim. The translator is an
//! opaque text-to-text collaborator (typically backed by a remote model); its
//! returned string is fed through the normal
//! tokenize→parse→check→execute path unchanged. This crate only defines the
//! seam; no concrete network client is shipped.

use anyhow::Result;

/// Turns a free-form request into a single command line.
pub trait Translator {
    fn translate(&self, request: &str) -> Result<String>;
}

#[cfg(test)]
pub(crate) struct FixedTranslator(pub String);

#[cfg(test)]
impl Translator for FixedTranslator {
    fn translate(&self, _request: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

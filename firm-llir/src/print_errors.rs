//! Rendering a `LoweringError` for a human, the way the teacher's `print_errors` crate renders a
//! `CodegenError` against a `Function` — except this core has no source-map/location apparatus to
//! decorate with, so there's nothing to build beyond formatting the error itself.

use crate::result::LoweringError;
use crate::verifier::VerifierErrors;
use std::fmt::Write;

/// Render `error` as a one-paragraph message suitable for a compiler diagnostic.
///
/// For `LoweringError::Verifier`, every individual `VerifierError` is itemized on its own line
/// rather than relying on the aggregate `Display` impl, since a caller displaying compiler errors
/// wants one line per violation.
pub fn pretty_error(error: &LoweringError) -> String {
    match error {
        LoweringError::Verifier(errors) => pretty_verifier_errors(errors),
        other => format!("error: {}", other),
    }
}

fn pretty_verifier_errors(errors: &VerifierErrors) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "verifier failed with {} error(s):", errors.0.len());
    for err in &errors.0 {
        let _ = writeln!(out, "  {}", err);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::builder::GraphBuilder;
    use crate::width::Width;

    #[test]
    fn non_verifier_errors_format_with_the_fail_display() {
        let mut b = GraphBuilder::new();
        let start = b.start_block();
        let node = b.const_(start, 0, Width::Bit32);
        let error = LoweringError::UnsupportedConversion { node, block: start };
        assert!(pretty_error(&error).starts_with("error: unsupported conversion"));
    }
}

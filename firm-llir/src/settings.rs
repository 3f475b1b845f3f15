//! Lowering configuration, in the style of the teacher's `settings::Flags`: a small, explicit
//! struct with a `Default` matching the documented defaults, plus a builder for the cases where
//! constructing it field-by-field reads awkwardly at the call site.

/// Configuration for one `FirmToLlir` run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// Dump the source graph, pre-lowering, for debugging.
    pub dump: bool,
    /// Use the pattern-matching instruction-selection visitor instead of the baseline one.
    ///
    /// The baseline visitor this core ships is the only one implemented; this flag is carried so
    /// a downstream `InstructionSelection` subclass has somewhere to hang its own override without
    /// this core's driver needing to change shape.
    pub optimize: bool,
    /// Run `verify_llir_graph` after finalization and turn any violation into a
    /// `LoweringError::Verifier`.
    pub enable_verifier: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dump: false,
            optimize: false,
            enable_verifier: true,
        }
    }
}

impl Options {
    /// Start from the defaults.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

/// Builds an `Options`, one field at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionsBuilder {
    options: OptionsOverride,
}

#[derive(Clone, Copy, Debug, Default)]
struct OptionsOverride {
    dump: Option<bool>,
    optimize: Option<bool>,
    enable_verifier: Option<bool>,
}

impl OptionsBuilder {
    /// Set `dump`.
    pub fn dump(mut self, dump: bool) -> Self {
        self.options.dump = Some(dump);
        self
    }

    /// Set `optimize`.
    pub fn optimize(mut self, optimize: bool) -> Self {
        self.options.optimize = Some(optimize);
        self
    }

    /// Set `enable_verifier`.
    pub fn enable_verifier(mut self, enable_verifier: bool) -> Self {
        self.options.enable_verifier = Some(enable_verifier);
        self
    }

    /// Finish, falling back to `Options::default()` for any field left unset.
    pub fn finish(self) -> Options {
        let defaults = Options::default();
        Options {
            dump: self.options.dump.unwrap_or(defaults.dump),
            optimize: self.options.optimize.unwrap_or(defaults.optimize),
            enable_verifier: self.options.enable_verifier.unwrap_or(defaults.enable_verifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_contract() {
        let options = Options::default();
        assert!(!options.dump);
        assert!(!options.optimize);
        assert!(options.enable_verifier);
    }

    #[test]
    fn builder_overrides_only_what_is_set() {
        let options = Options::builder().dump(true).finish();
        assert!(options.dump);
        assert!(!options.optimize);
        assert!(options.enable_verifier);
    }
}

//! Compilation options shared by the library API and the CLI.

/// Options for a single `compile` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name recorded on the produced IR module and used for object output.
    pub module_name: String,
    /// Collect the numbered lowering trace.
    pub verbose: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            verbose: false,
        }
    }
}

impl CompileOptions {
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.module_name = name.to_string();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

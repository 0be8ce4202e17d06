//! The library model handed to the build planner.

use crate::plan::CompileRules;
use crate::source::SourceRoot;
use crate::usage::Usage;

/// One buildable library: a named source tree plus its usage edges.
///
/// Front-ends construct these from project manifests; the planner treats
/// them as read-only input.
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    pub src_root: SourceRoot,
    /// Libraries whose headers and archives this library needs.
    pub uses: Vec<Usage>,
    /// Additional libraries linked into this library's executables.
    pub links: Vec<Usage>,
}

impl Library {
    pub fn new(name: impl Into<String>, src_root: SourceRoot) -> Self {
        Self {
            name: name.into(),
            src_root,
            uses: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_uses(mut self, uses: Vec<Usage>) -> Self {
        self.uses = uses;
        self
    }

    pub fn with_links(mut self, links: Vec<Usage>) -> Self {
        self.links = links;
        self
    }

    /// The baseline compile rules for this library's own translation
    /// units: its source root on the include path, its usage edges for
    /// dependency headers.
    pub fn base_compile_rules(&self) -> CompileRules {
        CompileRules {
            include_dirs: vec![self.src_root.path.clone()],
            defs: Vec::new(),
            enable_warnings: false,
            uses: self.uses.clone(),
        }
    }
}

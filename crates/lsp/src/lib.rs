//! Redmatch Language Server Protocol implementation for IDE integration.
//!
//! Provides parse diagnostics on open, change and save, semantic token
//! highlighting, and document state management for open files. Connects
//! to editors via the `redmatch lsp` CLI subcommand over stdio.

pub mod diagnostics;
pub mod document;
pub mod semantic_tokens;
pub mod server;

/// Run the LSP server over stdio. This is the public entry point
/// called by `redmatch lsp`.
pub fn run(max_errors: usize) -> Result<(), Box<dyn std::error::Error>> {
    server::run(max_errors)
}

// ABOUTME: Core types and utilities for Crucible
// ABOUTME: Shared file-tree snapshot model, wire types, and directory search

pub mod protocol;
pub mod tree;

// Re-export main types
pub use protocol::{
    CompileLatexRequest, CreatedExecution, ErrorBody, ExecuteRequest, ExecutionListing,
    ExecutionOutput, LATEX_WARNINGS_HEADER,
};
pub use tree::{find_directory, FileNode, TreeStats};

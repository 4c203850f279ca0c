// ABOUTME: File tree snapshot types shared by the sandbox service and its clients
// ABOUTME: Serialized node/stats shapes plus iterative depth-first directory search

use serde::{Deserialize, Serialize};

/// One node of a recursive execution-directory snapshot.
///
/// Serialized with an internal `type` tag, so a file renders as
/// `{"type": "file", "name": ..., "size": ..., "extension": ...}` and a
/// directory as `{"type": "directory", "name": ..., "children": [...]}`.
/// Children are ordered by name so snapshots are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileNode {
    File {
        name: String,
        size: u64,
        /// Extension without the leading dot; omitted when the file has none.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    Directory {
        name: String,
        children: Vec<FileNode>,
    },
}

impl FileNode {
    pub fn name(&self) -> &str {
        match self {
            FileNode::File { name, .. } => name,
            FileNode::Directory { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileNode::Directory { .. })
    }

    /// Direct children; empty for files.
    pub fn children(&self) -> &[FileNode] {
        match self {
            FileNode::Directory { children, .. } => children,
            FileNode::File { .. } => &[],
        }
    }

    /// Direct child file (not directory) with the given name.
    pub fn child_file(&self, name: &str) -> Option<&FileNode> {
        self.children()
            .iter()
            .find(|child| !child.is_directory() && child.name() == name)
    }
}

/// Aggregate numbers reported alongside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    pub total_files: u64,
    pub total_size: u64,
    pub execution_id: String,
    /// Creation time of the execution directory, seconds since the Unix epoch.
    pub created_time: f64,
}

/// Find the first directory named `target`, depth-first pre-order: a node is
/// visited before its children, children in recorded (name) order.
///
/// Walks an explicit stack rather than recursing; snapshot depth comes from
/// untrusted executions and must not be able to exhaust the call stack.
pub fn find_directory<'a>(root: &'a FileNode, target: &str) -> Option<&'a FileNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let FileNode::Directory { name, children } = node {
            if name == target {
                return Some(node);
            }
            // Reversed push keeps the first child on top of the stack.
            stack.extend(children.iter().rev().filter(|c| c.is_directory()));
        }
    }
    None
}

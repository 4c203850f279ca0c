// ABOUTME: Collects markdown reports from a verified test folder
// ABOUTME: Fetches direct-child .md files from a fresh execution snapshot

use crucible_client::{ExecutionClient, Result};
use crucible_core::tree::{find_directory, FileNode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One markdown artifact produced by a test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub filename: String,
    pub content: String,
}

/// Fetch the content of every direct-child `.md` file of `test_{test_number}`
/// from a fresh snapshot. A missing folder yields no reports rather than an
/// error; the verify step has already decided the cycle's outcome.
pub async fn collect_reports(
    client: &ExecutionClient,
    execution_id: &str,
    test_number: &str,
) -> Result<Vec<TestReport>> {
    let listing = client.list_files(execution_id).await?;
    let folder_name = format!("test_{}", test_number);

    let Some(folder) = find_directory(&listing.structure, &folder_name) else {
        debug!("No {} folder in execution {}", folder_name, execution_id);
        return Ok(Vec::new());
    };

    let mut reports = Vec::new();
    for child in folder.children() {
        if let FileNode::File {
            name, extension, ..
        } = child
        {
            if extension.as_deref() == Some("md") {
                let bytes = client
                    .get_file(execution_id, &format!("{}/{}", folder.name(), name))
                    .await?;
                reports.push(TestReport {
                    filename: name.clone(),
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
        }
    }

    Ok(reports)
}

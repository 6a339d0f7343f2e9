//! Workspace file tools for toolloop.
//!
//! Five tools give the agent access to a sandboxed directory: read, write,
//! edit, list, and search files. Calls are dispatched through
//! [`ToolInvocation`], a typed variant per tool, and [`WorkspaceTools`]
//! renders every outcome as result text for the model.

pub mod edit_file;
pub mod list_files;
pub mod read_file;
pub mod search_files;
pub mod write_file;

use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_core::tool::{ERROR_PREFIX, ToolExecutor};
use toolloop_security::{PathValidationError, WorkspaceSandbox};

pub use edit_file::EditFileParams;
pub use list_files::ListFilesParams;
pub use read_file::ReadFileParams;
pub use search_files::SearchFilesParams;
pub use write_file::WriteFileParams;

/// The fixed tool catalog, in the order it is offered to the model.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        read_file::definition(),
        write_file::definition(),
        edit_file::definition(),
        list_files::definition(),
        search_files::definition(),
    ]
}

/// A validated call to one of the workspace tools.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ReadFile(ReadFileParams),
    WriteFile(WriteFileParams),
    EditFile(EditFileParams),
    ListFiles(ListFilesParams),
    SearchFiles(SearchFilesParams),
}

impl ToolInvocation {
    /// Map a tool name and parsed arguments onto a typed invocation.
    pub fn parse(name: &str, arguments: serde_json::Value) -> Result<Self, ToolError> {
        let invocation = match name {
            read_file::NAME => Self::ReadFile(params(name, arguments)?),
            write_file::NAME => Self::WriteFile(params(name, arguments)?),
            edit_file::NAME => {
                let edit: EditFileParams = params(name, arguments)?;
                if edit.search.is_empty() {
                    return Err(ToolError::InvalidArguments {
                        tool_name: name.into(),
                        reason: "search must not be empty".into(),
                    });
                }
                Self::EditFile(edit)
            }
            list_files::NAME => Self::ListFiles(params(name, arguments)?),
            search_files::NAME => Self::SearchFiles(params(name, arguments)?),
            other => return Err(ToolError::NotFound(other.into())),
        };
        Ok(invocation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile(_) => read_file::NAME,
            Self::WriteFile(_) => write_file::NAME,
            Self::EditFile(_) => edit_file::NAME,
            Self::ListFiles(_) => list_files::NAME,
            Self::SearchFiles(_) => search_files::NAME,
        }
    }
}

fn params<T: DeserializeOwned>(name: &str, arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool_name: name.into(),
        reason: e.to_string(),
    })
}

/// The tool executor backed by a workspace sandbox.
#[derive(Debug, Clone)]
pub struct WorkspaceTools {
    sandbox: WorkspaceSandbox,
}

impl WorkspaceTools {
    pub fn new(sandbox: WorkspaceSandbox) -> Self {
        Self { sandbox }
    }

    /// Open the workspace at `root`, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, PathValidationError> {
        Ok(Self::new(WorkspaceSandbox::new(root)?))
    }

    pub fn sandbox(&self) -> &WorkspaceSandbox {
        &self.sandbox
    }

    /// Run a validated invocation.
    pub async fn run(&self, invocation: ToolInvocation) -> Result<String, ToolError> {
        match invocation {
            ToolInvocation::ReadFile(p) => read_file::run(&self.sandbox, p).await,
            ToolInvocation::WriteFile(p) => write_file::run(&self.sandbox, p).await,
            ToolInvocation::EditFile(p) => edit_file::run(&self.sandbox, p).await,
            ToolInvocation::ListFiles(p) => list_files::run(&self.sandbox, p).await,
            ToolInvocation::SearchFiles(p) => search_files::run(&self.sandbox, p).await,
        }
    }
}

#[async_trait]
impl ToolExecutor for WorkspaceTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
        let outcome = match ToolInvocation::parse(name, arguments) {
            Ok(invocation) => self.run(invocation).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(tool = name, error = %e, "Tool call failed");
                format!("{ERROR_PREFIX} {e}")
            }
        }
    }
}

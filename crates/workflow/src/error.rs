//! Workflow structural validation errors.

use relay_core::ActionRef;
use thiserror::Error;

/// Errors raised while validating a workflow definition's structure.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The definition contains no actions.
    #[error("workflow has no actions")]
    Empty,

    /// The designated entrypoint ref does not exist.
    #[error("entrypoint '{0}' not found in actions")]
    MissingEntrypoint(ActionRef),

    /// An edge references a ref that is not an action.
    #[error("edge '{edge_id}' references unknown action '{action_ref}'")]
    UnknownEdgeRef {
        /// The offending edge.
        edge_id: String,
        /// The ref that does not exist.
        action_ref: ActionRef,
    },

    /// An action depends on a ref that is not an action.
    #[error("action '{action_ref}' depends on unknown action '{dependency}'")]
    UnknownDependency {
        /// The action declaring the dependency.
        action_ref: ActionRef,
        /// The ref that does not exist.
        dependency: ActionRef,
    },

    /// An input mapping pulls from a ref the action does not depend on.
    #[error(
        "action '{action_ref}' maps input '{target_port}' from '{source_ref}' \
         which is not in its dependencies"
    )]
    UndeclaredMappingSource {
        /// The action declaring the mapping.
        action_ref: ActionRef,
        /// The mapped input port.
        target_port: String,
        /// The upstream ref that is not a declared dependency.
        source_ref: ActionRef,
    },

    /// The graph contains a cycle.
    #[error("workflow graph has a cycle through: {}", refs_list(.0))]
    Cycle(Vec<ActionRef>),
}

fn refs_list(refs: &[ActionRef]) -> String {
    refs.iter()
        .map(ActionRef::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

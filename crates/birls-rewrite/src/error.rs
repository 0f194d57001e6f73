use uuid::Uuid;

/// Failure from a single [`crate::Assembler`] invocation.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("block {block} was not found in the module being rewritten")]
    UnknownBlock { block: Uuid },
    #[error("assembler rejected block {block}: {message}")]
    Rejected { block: Uuid, message: String },
}

/// Failure from the save-time commit pipeline (spec.md §4.5, K6).
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error(transparent)]
    Assembler(#[from] AssembleError),

    /// The session was constructed with rewriting disabled; the trait
    /// boundary still models this even though this workspace always
    /// constructs a [`crate::LiteralPatchAssembler`] (DESIGN.md Open Question 2).
    #[error("rewriting is disabled for this session")]
    Unavailable,
}

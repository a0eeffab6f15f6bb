mod graph;
mod table;

pub use graph::{
    EbdGraph, EbdGraphEdge, EbdGraphMetaData, EbdGraphNode, END_NODE_KEY, START_NODE_KEY,
};
pub use table::{BranchTarget, EbdTable, EbdTableMetaData, EbdTableRow};

pub(crate) use table::{RESULT_CODE_PATTERN, STEP_NUMBER_PATTERN};

//! Pipeline domain model

use crate::core::{
    error::ConstructionError,
    stage::Stage,
    structure,
};
use std::sync::Arc;

/// One element of a pipeline: a stage, or a group run in parallel
#[derive(Debug, Clone)]
pub enum Node {
    Stage(Arc<Stage>),
    /// Members run concurrently from the same context and merge in declared order
    Group(Vec<Node>),
}

impl Node {
    /// Build a parallel group
    pub fn group<I, N>(members: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Node::Group(members.into_iter().map(Into::into).collect())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    /// Number of stages at every depth below this node
    pub fn stage_count(&self) -> usize {
        match self {
            Node::Stage(_) => 1,
            Node::Group(members) => members.iter().map(Node::stage_count).sum(),
        }
    }
}

impl From<Stage> for Node {
    fn from(stage: Stage) -> Self {
        Node::Stage(Arc::new(stage))
    }
}

impl From<Arc<Stage>> for Node {
    fn from(stage: Arc<Stage>) -> Self {
        Node::Stage(stage)
    }
}

impl From<Vec<Node>> for Node {
    fn from(members: Vec<Node>) -> Self {
        Node::Group(members)
    }
}

/// A validated, runnable pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name, used in logs
    pub name: String,

    nodes: Arc<[Node]>,
}

impl Pipeline {
    /// Build a pipeline from its top-level elements.
    ///
    /// Fails when there are no elements or when any group, at any depth, is
    /// empty.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ConstructionError> {
        structure::check_nodes(&nodes)?;
        Ok(Self {
            name: "pipeline".to_string(),
            nodes: nodes.into(),
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Top-level elements, executed in order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Total number of stages at every depth
    pub fn stage_count(&self) -> usize {
        self.nodes.iter().map(Node::stage_count).sum()
    }
}

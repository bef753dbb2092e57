use super::design::{ProcessDesign, UnitKind};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

new_key_type! {
    pub struct UnitKey;
}

/// Where a stream sits in the flowsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    Feed,
    Internal,
    Outlet,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DesignError {
    #[error("Design contains no unit operations")]
    NoUnits,

    #[error("A unit operation has an empty id")]
    EmptyUnitId,

    #[error("A stream has an empty id")]
    EmptyStreamId,

    #[error("Unit id '{0}' is used more than once")]
    DuplicateUnit(String),

    #[error("Stream id '{0}' is used more than once")]
    DuplicateStream(String),

    #[error("Stream '{stream}' references unknown unit '{unit}'")]
    UnknownUnit { stream: String, unit: String },

    #[error("Stream '{0}' has neither a source nor a destination")]
    DanglingStream(String),

    #[error("Stream '{stream}' leaves and re-enters unit '{unit}'")]
    SelfLoop { stream: String, unit: String },

    #[error("Design has no feed stream")]
    NoFeed,

    #[error("Design has no outlet stream")]
    NoOutlet,

    #[error("Unit '{0}' has no inlet stream")]
    UnitWithoutInlet(String),

    #[error("Unit '{0}' has no outlet stream")]
    UnitWithoutOutlet(String),

    #[error("Units not reachable from any feed: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct UnitNode {
    pub id: String,
    pub block_type: String,
    pub kind: UnitKind,
}

#[derive(Debug, Clone)]
pub struct StreamEdge {
    pub id: String,
    pub source: Option<UnitKey>,
    pub destination: Option<UnitKey>,
    pub role: StreamRole,
}

/// The validated, connected form of a [`ProcessDesign`].
///
/// Building the graph is the structural check the loop runs before anything is sent to the
/// simulator. Recycle loops are allowed; every unit must be fed, must discharge, and must be
/// reachable from at least one feed.
#[derive(Debug, Clone, Default)]
pub struct ProcessGraph {
    units: SlotMap<UnitKey, UnitNode>,
    unit_index: HashMap<String, UnitKey>,
    streams: Vec<StreamEdge>,
    downstream: SecondaryMap<UnitKey, Vec<UnitKey>>,
}

impl ProcessGraph {
    pub fn build(design: &ProcessDesign) -> Result<Self, DesignError> {
        if design.units.is_empty() {
            return Err(DesignError::NoUnits);
        }

        let mut graph = ProcessGraph::default();
        for unit in &design.units {
            let id = unit.id.trim();
            if id.is_empty() {
                return Err(DesignError::EmptyUnitId);
            }
            if graph.unit_index.contains_key(id) {
                return Err(DesignError::DuplicateUnit(id.to_string()));
            }
            let key = graph.units.insert(UnitNode {
                id: id.to_string(),
                block_type: unit.block_type.clone(),
                kind: unit.kind(),
            });
            graph.unit_index.insert(id.to_string(), key);
            graph.downstream.insert(key, Vec::new());
        }

        let mut stream_ids = HashSet::new();
        let mut has_inlet: HashSet<UnitKey> = HashSet::new();
        let mut has_outlet: HashSet<UnitKey> = HashSet::new();

        for connection in &design.connections {
            let stream = connection.stream.trim();
            if stream.is_empty() {
                return Err(DesignError::EmptyStreamId);
            }
            if !stream_ids.insert(stream.to_string()) {
                return Err(DesignError::DuplicateStream(stream.to_string()));
            }

            let source = graph.resolve(stream, connection.source.as_deref())?;
            let destination = graph.resolve(stream, connection.destination.as_deref())?;

            let role = match (source, destination) {
                (None, None) => return Err(DesignError::DanglingStream(stream.to_string())),
                (Some(s), Some(d)) if s == d => {
                    return Err(DesignError::SelfLoop {
                        stream: stream.to_string(),
                        unit: graph.units[s].id.clone(),
                    });
                }
                (None, Some(_)) => StreamRole::Feed,
                (Some(_), None) => StreamRole::Outlet,
                (Some(_), Some(_)) => StreamRole::Internal,
            };

            if let Some(s) = source {
                has_outlet.insert(s);
            }
            if let Some(d) = destination {
                has_inlet.insert(d);
            }
            if let (Some(s), Some(d)) = (source, destination) {
                if let Some(next) = graph.downstream.get_mut(s) {
                    next.push(d);
                }
            }

            graph.streams.push(StreamEdge {
                id: stream.to_string(),
                source,
                destination,
                role,
            });
        }

        if graph.feeds().next().is_none() {
            return Err(DesignError::NoFeed);
        }
        if graph.outlets().next().is_none() {
            return Err(DesignError::NoOutlet);
        }
        for unit in &design.units {
            let key = graph.unit_index[unit.id.trim()];
            if !has_inlet.contains(&key) {
                return Err(DesignError::UnitWithoutInlet(graph.units[key].id.clone()));
            }
            if !has_outlet.contains(&key) {
                return Err(DesignError::UnitWithoutOutlet(graph.units[key].id.clone()));
            }
        }

        graph.check_reachability(design)?;
        Ok(graph)
    }

    fn resolve(&self, stream: &str, unit: Option<&str>) -> Result<Option<UnitKey>, DesignError> {
        match unit.map(str::trim).filter(|u| !u.is_empty()) {
            None => Ok(None),
            Some(id) => self
                .unit_index
                .get(id)
                .copied()
                .map(Some)
                .ok_or_else(|| DesignError::UnknownUnit {
                    stream: stream.to_string(),
                    unit: id.to_string(),
                }),
        }
    }

    fn check_reachability(&self, design: &ProcessDesign) -> Result<(), DesignError> {
        let mut visited: HashSet<UnitKey> = HashSet::new();
        let mut queue: VecDeque<UnitKey> = self.feeds().filter_map(|s| s.destination).collect();

        while let Some(key) = queue.pop_front() {
            if !visited.insert(key) {
                continue;
            }
            if let Some(next) = self.downstream.get(key) {
                queue.extend(next.iter().copied().filter(|k| !visited.contains(k)));
            }
        }

        // Report in design order so messages are stable.
        let unreachable: Vec<String> = design
            .units
            .iter()
            .filter_map(|u| self.unit_index.get(u.id.trim()))
            .filter(|k| !visited.contains(k))
            .map(|k| self.units[*k].id.clone())
            .collect();

        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(DesignError::Unreachable(unreachable))
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Units in the order the design declared them.
    pub fn units(&self) -> impl Iterator<Item = &UnitNode> {
        self.units.values()
    }

    pub fn feeds(&self) -> impl Iterator<Item = &StreamEdge> {
        self.streams.iter().filter(|s| s.role == StreamRole::Feed)
    }

    pub fn outlets(&self) -> impl Iterator<Item = &StreamEdge> {
        self.streams.iter().filter(|s| s.role == StreamRole::Outlet)
    }
}

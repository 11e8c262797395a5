//! JSON chart documents and key-value persistence.
//!
//! The same document shape is written to local storage, saved to files and
//! read by the viewer. Loading validates everything before a chart is built,
//! so a bad document never replaces the current one.

use crate::constants;
use crate::error::DocumentError;
use crate::geometry::Point;
use crate::store::OrgChart;
use crate::types::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

fn default_counter() -> u64 {
    1
}

fn default_title() -> String {
    constants::DEFAULT_CHART_TITLE.to_string()
}

fn default_title_pos() -> Point {
    ChartHeader::default().title_pos
}

fn default_horizontal_spacing() -> f32 {
    constants::DEFAULT_HORIZONTAL_SPACING
}

fn default_vertical_spacing() -> f32 {
    constants::DEFAULT_VERTICAL_SPACING
}

fn default_member_gap() -> f32 {
    constants::DEFAULT_MEMBER_GAP
}

/// Persisted chart document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    pub nodes: Vec<Node>,
    #[serde(default = "default_counter")]
    pub next_id: u64,
    #[serde(default = "default_title")]
    pub chart_title: String,
    #[serde(default)]
    pub chart_date: String,
    #[serde(default = "default_title_pos")]
    pub chart_title_pos: Point,
    #[serde(default)]
    pub chart_date_pos: DatePosition,
    #[serde(default)]
    pub node_groups: Vec<Group>,
    #[serde(default = "default_counter")]
    pub next_group_id: u64,
    #[serde(default = "default_horizontal_spacing")]
    pub horizontal_spacing: f32,
    #[serde(default = "default_vertical_spacing")]
    pub vertical_spacing: f32,
    #[serde(default = "default_member_gap")]
    pub member_gap: f32,
}

impl ChartDocument {
    /// Captures the persisted state of a chart.
    pub fn from_chart(chart: &OrgChart) -> Self {
        Self {
            nodes: chart.nodes().to_vec(),
            next_id: chart.next_id(),
            chart_title: chart.header.title.clone(),
            chart_date: chart.header.date.clone(),
            chart_title_pos: chart.header.title_pos,
            chart_date_pos: chart.header.date_pos,
            node_groups: chart.groups().to_vec(),
            next_group_id: chart.next_group_id(),
            horizontal_spacing: chart.settings.horizontal_spacing,
            vertical_spacing: chart.settings.vertical_spacing,
            member_gap: chart.settings.member_gap,
        }
    }

    /// Builds the chart described by this document.
    pub fn into_chart(self) -> OrgChart {
        OrgChart::from_parts(
            self.nodes,
            self.next_id,
            self.node_groups,
            self.next_group_id,
            ChartHeader {
                title: self.chart_title,
                date: self.chart_date,
                title_pos: self.chart_title_pos,
                date_pos: self.chart_date_pos,
            },
            ChartSettings {
                horizontal_spacing: self.horizontal_spacing,
                vertical_spacing: self.vertical_spacing,
                member_gap: self.member_gap,
            },
        )
    }

    /// Parses and validates a document.
    ///
    /// # Arguments
    ///
    /// * `json` - Document text
    ///
    /// # Returns
    ///
    /// The document, or an error if the JSON is malformed, lacks a `nodes`
    /// array or repeats a node id
    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.get("nodes").is_some_and(serde_json::Value::is_array) {
            return Err(DocumentError::MissingNodes);
        }
        let mut document: ChartDocument = serde_json::from_value(value)?;

        let mut seen = HashSet::new();
        for node in &document.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(DocumentError::DuplicateNodeId(node.id.clone()));
            }
        }

        // Groups referring to unknown nodes are trimmed rather than rejected.
        document.node_groups.retain_mut(|group| {
            group.node_ids.retain(|id| seen.contains(id.as_str()));
            group
                .relative_positions
                .retain(|r| seen.contains(r.node_id.as_str()));
            group.node_ids.len() >= 2 && group.contains(&group.base_node_id)
        });
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parses a document straight into a chart.
pub fn chart_from_json(json: &str) -> Result<OrgChart, DocumentError> {
    ChartDocument::parse(json).map(ChartDocument::into_chart)
}

/// Serializes a chart to document JSON.
pub fn chart_to_json(chart: &OrgChart) -> Result<String, DocumentError> {
    ChartDocument::from_chart(chart).to_json()
}

/// Minimal string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// In-memory store used by tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Writes the chart under [`constants::STORAGE_KEY`].
pub fn save_to_store(store: &mut dyn KeyValueStore, chart: &OrgChart) -> Result<(), DocumentError> {
    store.set(constants::STORAGE_KEY, chart_to_json(chart)?);
    Ok(())
}

/// Reads the chart stored under [`constants::STORAGE_KEY`].
pub fn load_from_store(store: &dyn KeyValueStore) -> Result<OrgChart, DocumentError> {
    let json = store.get(constants::STORAGE_KEY).ok_or(DocumentError::NotFound)?;
    chart_from_json(&json).inspect_err(|e| warn!("Stored chart could not be loaded: {e}"))
}

/// Reads a document file.
pub fn read_file(path: &Path) -> Result<OrgChart, DocumentError> {
    let json = std::fs::read_to_string(path)?;
    let chart = chart_from_json(&json)?;
    info!("Read {} node(s) from {}", chart.len(), path.display());
    Ok(chart)
}

/// Writes a document file.
pub fn write_file(path: &Path, chart: &OrgChart) -> Result<(), DocumentError> {
    std::fs::write(path, chart_to_json(chart)?)?;
    info!("Saved chart to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DeletionPolicy;

    fn sample_chart() -> OrgChart {
        let mut chart = OrgChart::new();
        let root = chart.create_root(
            NodeFields::named("President")
                .with_member(Member::new(MemberType::Faculty, "President", "Han")),
        );
        let office = chart
            .create_child(
                &root,
                NodeFields::named("Planning").with_member(Member {
                    member_type: MemberType::Staff,
                    position: "Lead".into(),
                    name: "Jung".into(),
                    note: "part-time".into(),
                }),
            )
            .unwrap();
        let lab = chart.create_child(&root, NodeFields::named("Lab")).unwrap();
        chart.set_locked(&lab, true).unwrap();
        chart.set_independent(&office, true).unwrap();
        chart.create_group(&[root, lab]).unwrap();
        chart.header.date = "2024-03-01".into();
        chart.settings.member_gap = 12.0;
        chart
    }

    #[test]
    fn test_round_trip_persistence() {
        let chart = sample_chart();
        let json = chart_to_json(&chart).unwrap();
        let reloaded = chart_from_json(&json).unwrap();
        assert_eq!(reloaded, chart);
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_document_field_names() {
        let doc = ChartDocument::from_chart(&sample_chart());
        let value = serde_json::to_value(&doc).unwrap();
        for key in [
            "nodes",
            "nextId",
            "chartTitle",
            "chartDate",
            "chartTitlePos",
            "chartDatePos",
            "nodeGroups",
            "nextGroupId",
            "horizontalSpacing",
            "verticalSpacing",
            "memberGap",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["chartDatePos"]["x"].is_null());
        assert_eq!(value["nodeGroups"][0]["relativePositions"][1]["offsetY"], 150.0);
    }

    #[test]
    fn test_missing_nodes_is_rejected() {
        assert!(matches!(
            ChartDocument::parse(r#"{"nextId": 3}"#),
            Err(DocumentError::MissingNodes)
        ));
        assert!(matches!(
            ChartDocument::parse(r#"{"nodes": {}}"#),
            Err(DocumentError::MissingNodes)
        ));
        assert!(matches!(ChartDocument::parse("nope"), Err(DocumentError::InvalidJson(_))));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let json = r#"{"nodes": [{"id": "node-1", "deptName": "A"}, {"id": "node-1", "deptName": "B"}]}"#;
        assert!(matches!(
            ChartDocument::parse(json),
            Err(DocumentError::DuplicateNodeId(id)) if id == "node-1"
        ));
    }

    #[test]
    fn test_minimal_document_gets_defaults() {
        let chart = chart_from_json(r#"{"nodes": [{"id": "node-7", "deptName": "A"}]}"#).unwrap();
        assert_eq!(chart.header.title, constants::DEFAULT_CHART_TITLE);
        assert_eq!(chart.settings, ChartSettings::default());
        assert_eq!(chart.next_id(), 8);
    }

    #[test]
    fn test_stale_group_members_are_trimmed() {
        let json = r#"{
            "nodes": [{"id": "node-1", "deptName": "A"}, {"id": "node-2", "deptName": "B"}],
            "nodeGroups": [
                {"id": "group-1", "nodeIds": ["node-1", "node-2", "node-9"], "baseNodeId": "node-1"},
                {"id": "group-2", "nodeIds": ["node-9", "node-2"], "baseNodeId": "node-9"}
            ]
        }"#;
        let doc = ChartDocument::parse(json).unwrap();
        assert_eq!(doc.node_groups.len(), 1);
        assert_eq!(doc.node_groups[0].node_ids, vec!["node-1", "node-2"]);
    }

    #[test]
    fn test_store_round_trip_and_missing_key() {
        let mut store = MemoryStore::default();
        assert!(matches!(load_from_store(&store), Err(DocumentError::NotFound)));

        let mut chart = sample_chart();
        chart.delete("node-2", DeletionPolicy::Promote).unwrap();
        save_to_store(&mut store, &chart).unwrap();
        assert_eq!(load_from_store(&store).unwrap(), chart);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("orgchart-{}.json", std::process::id()));
        let chart = sample_chart();
        write_file(&path, &chart).unwrap();
        assert_eq!(read_file(&path).unwrap(), chart);
        let _ = std::fs::remove_file(&path);
    }
}

//! Automatic tree layout.
//!
//! Every root tree is measured bottom-up (subtree widths) and then placed
//! top-down with each parent centered over its children. Root trees sit side
//! by side, the whole forest centered on the nominal canvas width.
//!
//! Independent nodes are left alone. Locked nodes keep their stored position
//! but still reserve their subtree width so siblings do not land on them.

use crate::constants;
use crate::error::ChartError;
use crate::geometry::NodeMetrics;
use crate::types::{ChartSettings, Group, Node, NodeId};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Parameters of a layout run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Gap between sibling subtrees
    pub horizontal_spacing: f32,
    /// Distance between levels
    pub vertical_spacing: f32,
    /// Y coordinate of root nodes
    pub base_y: f32,
    /// Width the forest is centered on
    pub canvas_width: f32,
    /// Gap between root trees as a multiple of `horizontal_spacing`
    pub tree_gap_factor: f32,
    /// Smallest x the forest may start at
    pub min_left: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::from_settings(&ChartSettings::default())
    }
}

impl LayoutConfig {
    /// Layout parameters for the chart's spacing settings.
    pub fn from_settings(settings: &ChartSettings) -> Self {
        Self {
            horizontal_spacing: settings.horizontal_spacing,
            vertical_spacing: settings.vertical_spacing,
            base_y: constants::LAYOUT_BASE_Y,
            canvas_width: constants::CANVAS_WIDTH,
            tree_gap_factor: constants::TREE_GAP_FACTOR,
            min_left: constants::LAYOUT_MIN_LEFT,
        }
    }

    fn tree_gap(&self) -> f32 {
        self.horizontal_spacing * self.tree_gap_factor
    }
}

/// Horizontal footprint reserved for one subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub left: f32,
    pub width: f32,
}

impl Span {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }
}

/// Result of a layout run.
#[derive(Debug, Clone, Default)]
pub struct LayoutOutcome {
    /// Subtree span of every laid-out node
    pub spans: HashMap<NodeId, Span>,
    /// Nodes whose position changed
    pub moved: Vec<NodeId>,
}

/// Parent/child structure of the nodes taking part in layout.
struct Forest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl Forest {
    /// Builds the forest, failing if some participating node is caught in a
    /// parent cycle (it can never be reached from a root).
    fn build(nodes: &[Node]) -> Result<Self, ChartError> {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            if node.is_independent {
                continue;
            }
            let parent = node
                .parent_id
                .as_deref()
                .and_then(|p| index.get(p).copied())
                .filter(|&p| !nodes[p].is_independent);
            match parent {
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        let mut reached = vec![false; nodes.len()];
        let mut stack = roots.clone();
        while let Some(i) = stack.pop() {
            if reached[i] {
                continue;
            }
            reached[i] = true;
            stack.extend(children[i].iter().copied());
        }
        if let Some(i) = (0..nodes.len()).find(|&i| !nodes[i].is_independent && !reached[i]) {
            warn!("Layout aborted: {} sits on a parent cycle", nodes[i].id);
            return Err(ChartError::CycleDetected(nodes[i].id.clone()));
        }

        Ok(Self { roots, children })
    }
}

/// Lays out the forest in place.
///
/// # Arguments
///
/// * `nodes` - All nodes of the chart
/// * `groups` - Groups whose members follow their base node
/// * `metrics` - Rendered node sizes
/// * `config` - Spacing parameters
///
/// # Returns
///
/// Subtree spans and moved nodes, or `CycleDetected` with no node touched
pub fn layout(
    nodes: &mut [Node],
    groups: &[Group],
    metrics: &dyn NodeMetrics,
    config: &LayoutConfig,
) -> Result<LayoutOutcome, ChartError> {
    let forest = Forest::build(nodes)?;
    if forest.roots.is_empty() {
        return Ok(LayoutOutcome::default());
    }

    let node_widths: Vec<f32> = nodes.iter().map(|n| metrics.size_of(n).width).collect();
    let mut subtree = vec![0.0_f32; nodes.len()];
    for &root in &forest.roots {
        measure(root, &forest, &node_widths, config, &mut subtree);
    }

    let total: f32 = forest.roots.iter().map(|&r| subtree[r]).sum::<f32>()
        + config.tree_gap() * (forest.roots.len() as f32 - 1.0);
    let mut left = ((config.canvas_width - total) / 2.0).max(config.min_left);

    let before: Vec<(f32, f32)> = nodes.iter().map(|n| (n.x, n.y)).collect();
    let mut placed = vec![false; nodes.len()];
    let mut outcome = LayoutOutcome::default();

    for &root in &forest.roots {
        let mut pending = vec![(root, left, 0usize)];
        while let Some((i, span_left, level)) = pending.pop() {
            let width = subtree[i];
            outcome.spans.insert(
                nodes[i].id.clone(),
                Span {
                    left: span_left,
                    width,
                },
            );
            if !nodes[i].locked {
                nodes[i].x = span_left + (width - node_widths[i]) / 2.0;
                nodes[i].y = config.base_y + level as f32 * config.vertical_spacing;
                placed[i] = true;
            }

            let kids = &forest.children[i];
            let kids_total = children_width(kids, &subtree, config);
            let mut child_left = span_left + (width - kids_total) / 2.0;
            let mut batch = Vec::with_capacity(kids.len());
            for &k in kids {
                batch.push((k, child_left, level + 1));
                child_left += subtree[k] + config.horizontal_spacing;
            }
            // Reverse so children pop in insertion order.
            pending.extend(batch.into_iter().rev());
        }
        left += subtree[root] + config.tree_gap();
    }

    apply_groups(nodes, groups, &placed);

    outcome.moved = nodes
        .iter()
        .zip(&before)
        .filter(|(n, old)| n.x != old.0 || n.y != old.1)
        .map(|(n, _)| n.id.clone())
        .collect();
    debug!(
        "Layout placed {} root tree(s), {} node(s) moved",
        forest.roots.len(),
        outcome.moved.len()
    );
    Ok(outcome)
}

/// Post-order subtree width computation.
fn measure(root: usize, forest: &Forest, node_widths: &[f32], config: &LayoutConfig, out: &mut [f32]) {
    let mut stack = vec![(root, false)];
    while let Some((i, expanded)) = stack.pop() {
        let kids = &forest.children[i];
        if expanded || kids.is_empty() {
            out[i] = node_widths[i].max(children_width(kids, out, config));
        } else {
            stack.push((i, true));
            stack.extend(kids.iter().map(|&k| (k, false)));
        }
    }
}

fn children_width(kids: &[usize], subtree: &[f32], config: &LayoutConfig) -> f32 {
    if kids.is_empty() {
        return 0.0;
    }
    kids.iter().map(|&k| subtree[k]).sum::<f32>() + config.horizontal_spacing * (kids.len() as f32 - 1.0)
}

/// Moves group members to their stored offset from a base node the layout
/// just placed. Locked and independent members keep their position.
fn apply_groups(nodes: &mut [Node], groups: &[Group], placed: &[bool]) {
    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();

    for group in groups {
        let Some(&base) = index.get(&group.base_node_id) else {
            continue;
        };
        if !placed[base] {
            continue;
        }
        let (bx, by) = (nodes[base].x, nodes[base].y);
        let mut seen = HashSet::new();
        for id in &group.node_ids {
            if *id == group.base_node_id || !seen.insert(id) {
                continue;
            }
            let (Some(&i), Some((dx, dy))) = (index.get(id), group.offset_of(id)) else {
                continue;
            };
            if nodes[i].locked || nodes[i].is_independent {
                continue;
            }
            nodes[i].x = bx + dx;
            nodes[i].y = by + dy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, UniformSize};
    use crate::types::{NodeFields, RelativePosition};
    use proptest::prelude::*;

    fn node(id: &str, parent: Option<&str>) -> Node {
        Node::new(id.into(), NodeFields::named(id), parent.map(String::from), 0.0, 0.0)
    }

    fn uniform() -> UniformSize {
        UniformSize(Size::new(100.0, 40.0))
    }

    fn positions(nodes: &[Node]) -> Vec<(f32, f32)> {
        nodes.iter().map(|n| (n.x, n.y)).collect()
    }

    #[test]
    fn test_parent_centered_over_children() {
        let mut nodes = vec![node("r", None), node("a", Some("r")), node("b", Some("r"))];
        let config = LayoutConfig::default();
        let outcome = layout(&mut nodes, &[], &uniform(), &config).unwrap();

        // Subtree width 100 + 40 + 100 = 240, centered on 2100.
        let left = (2100.0 - 240.0) / 2.0;
        assert_eq!(outcome.spans["r"], Span { left, width: 240.0 });
        assert_eq!((nodes[0].x, nodes[0].y), (left + 70.0, 100.0));
        assert_eq!((nodes[1].x, nodes[1].y), (left, 250.0));
        assert_eq!((nodes[2].x, nodes[2].y), (left + 140.0, 250.0));
    }

    #[test]
    fn test_sibling_spans_do_not_overlap() {
        let mut nodes = vec![
            node("r", None),
            node("a", Some("r")),
            node("b", Some("r")),
            node("c", Some("r")),
        ];
        let widths: HashMap<NodeId, Size> = [("r", 100.0), ("a", 100.0), ("b", 150.0), ("c", 80.0)]
            .into_iter()
            .map(|(id, w)| (id.to_string(), Size::new(w, 40.0)))
            .collect();
        let config = LayoutConfig {
            horizontal_spacing: 20.0,
            ..Default::default()
        };

        let outcome = layout(&mut nodes, &[], &widths, &config).unwrap();
        let spans: Vec<Span> = ["a", "b", "c"].iter().map(|id| outcome.spans[*id]).collect();
        assert!(spans[0].right() <= spans[1].left);
        assert!(spans[1].right() <= spans[2].left);
        assert_eq!(outcome.spans["r"].width, 370.0);
    }

    #[test]
    fn test_layout_is_idempotent() {
        let mut nodes = vec![
            node("r", None),
            node("a", Some("r")),
            node("b", Some("a")),
            node("s", None),
        ];
        let config = LayoutConfig::default();
        layout(&mut nodes, &[], &uniform(), &config).unwrap();
        let first = positions(&nodes);
        let outcome = layout(&mut nodes, &[], &uniform(), &config).unwrap();
        assert_eq!(first, positions(&nodes));
        assert!(outcome.moved.is_empty());
    }

    #[test]
    fn test_independent_node_untouched() {
        let mut loner = node("x", Some("r"));
        loner.is_independent = true;
        loner.x = 7.0;
        loner.y = 9.0;
        let mut nodes = vec![node("r", None), loner];

        let outcome = layout(&mut nodes, &[], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!((nodes[1].x, nodes[1].y), (7.0, 9.0));
        assert!(!outcome.spans.contains_key("x"));
    }

    #[test]
    fn test_locked_node_keeps_position_and_reserves_width() {
        let mut locked = node("a", Some("r"));
        locked.locked = true;
        locked.x = 5.0;
        locked.y = 6.0;
        let mut nodes = vec![node("r", None), locked, node("b", Some("r"))];

        let outcome = layout(&mut nodes, &[], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!((nodes[1].x, nodes[1].y), (5.0, 6.0));
        assert!(outcome.spans["a"].right() <= outcome.spans["b"].left);
        assert_eq!(nodes[2].x, outcome.spans["b"].left);
    }

    #[test]
    fn test_roots_side_by_side_with_tree_gap() {
        let mut nodes = vec![node("r1", None), node("r2", None)];
        let config = LayoutConfig::default();
        let outcome = layout(&mut nodes, &[], &uniform(), &config).unwrap();
        let gap = outcome.spans["r2"].left - outcome.spans["r1"].right();
        assert_eq!(gap, config.horizontal_spacing * config.tree_gap_factor);
    }

    #[test]
    fn test_dangling_parent_laid_out_as_root() {
        let mut nodes = vec![node("a", Some("ghost"))];
        layout(&mut nodes, &[], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!(nodes[0].y, constants::LAYOUT_BASE_Y);
    }

    #[test]
    fn test_empty_forest_is_noop() {
        let mut nodes: Vec<Node> = Vec::new();
        let outcome = layout(&mut nodes, &[], &uniform(), &LayoutConfig::default()).unwrap();
        assert!(outcome.spans.is_empty());
    }

    #[test]
    fn test_cycle_is_reported_without_mutation() {
        let mut a = node("a", Some("b"));
        a.x = 1.0;
        let b = node("b", Some("a"));
        let mut nodes = vec![node("r", None), a, b];
        nodes[0].x = 3.0;

        let err = layout(&mut nodes, &[], &uniform(), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, ChartError::CycleDetected(_)));
        assert_eq!(nodes[0].x, 3.0);
        assert_eq!(nodes[1].x, 1.0);
    }

    #[test]
    fn test_group_members_follow_base() {
        let mut nodes = vec![node("r", None), node("a", None)];
        let group = Group {
            id: "group-1".into(),
            node_ids: vec!["r".into(), "a".into()],
            base_node_id: "r".into(),
            relative_positions: vec![RelativePosition {
                node_id: "a".into(),
                offset_x: 300.0,
                offset_y: 20.0,
            }],
        };

        layout(&mut nodes, &[group.clone()], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!(nodes[1].x, nodes[0].x + 300.0);
        assert_eq!(nodes[1].y, nodes[0].y + 20.0);

        let snapshot = positions(&nodes);
        layout(&mut nodes, &[group], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!(snapshot, positions(&nodes));
    }

    #[test]
    fn test_independent_group_member_stays() {
        let mut loner = node("x", Some("r"));
        loner.is_independent = true;
        loner.x = 7.0;
        loner.y = 9.0;
        let mut nodes = vec![node("r", None), loner, node("a", None)];
        let group = Group {
            id: "group-1".into(),
            node_ids: vec!["r".into(), "x".into(), "a".into()],
            base_node_id: "r".into(),
            relative_positions: vec![
                RelativePosition {
                    node_id: "x".into(),
                    offset_x: 300.0,
                    offset_y: 20.0,
                },
                RelativePosition {
                    node_id: "a".into(),
                    offset_x: -300.0,
                    offset_y: 0.0,
                },
            ],
        };

        layout(&mut nodes, &[group], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!((nodes[1].x, nodes[1].y), (7.0, 9.0));
        assert_eq!((nodes[2].x, nodes[2].y), (nodes[0].x - 300.0, nodes[0].y));
    }

    #[test]
    fn test_locked_group_member_stays() {
        let mut follower = node("a", None);
        follower.locked = true;
        follower.x = 11.0;
        let mut nodes = vec![node("r", None), follower];
        let group = Group {
            id: "group-1".into(),
            node_ids: vec!["r".into(), "a".into()],
            base_node_id: "r".into(),
            relative_positions: vec![RelativePosition {
                node_id: "a".into(),
                offset_x: 50.0,
                offset_y: 0.0,
            }],
        };
        layout(&mut nodes, &[group], &uniform(), &LayoutConfig::default()).unwrap();
        assert_eq!(nodes[1].x, 11.0);
    }

    fn arb_forest() -> impl Strategy<Value = (Vec<Option<usize>>, Vec<f32>)> {
        (1usize..14).prop_flat_map(|n| {
            let parents = (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(None::<usize>).boxed()
                    } else {
                        proptest::option::of(0..i).boxed()
                    }
                })
                .collect::<Vec<_>>();
            let widths = proptest::collection::vec(60.0f32..220.0, n);
            (parents, widths)
        })
    }

    fn build(parents: &[Option<usize>], widths: &[f32]) -> (Vec<Node>, HashMap<NodeId, Size>) {
        let nodes = parents
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let parent = p.map(|p| format!("n{p}"));
                Node::new(format!("n{i}"), NodeFields::named("x"), parent, 0.0, 0.0)
            })
            .collect();
        let sizes = widths
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("n{i}"), Size::new(*w, 40.0)))
            .collect();
        (nodes, sizes)
    }

    proptest! {
        #[test]
        fn prop_layout_idempotent((parents, widths) in arb_forest()) {
            let (mut nodes, sizes) = build(&parents, &widths);
            let config = LayoutConfig::default();
            layout(&mut nodes, &[], &sizes, &config).unwrap();
            let first = positions(&nodes);
            layout(&mut nodes, &[], &sizes, &config).unwrap();
            prop_assert_eq!(first, positions(&nodes));
        }

        #[test]
        fn prop_sibling_spans_disjoint((parents, widths) in arb_forest(), spacing in 0.0f32..80.0) {
            let (mut nodes, sizes) = build(&parents, &widths);
            let config = LayoutConfig { horizontal_spacing: spacing, ..Default::default() };
            let outcome = layout(&mut nodes, &[], &sizes, &config).unwrap();

            for (i, _) in parents.iter().enumerate() {
                let mut kids: Vec<Span> = parents
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| **p == Some(i))
                    .map(|(k, _)| outcome.spans[&format!("n{k}")])
                    .collect();
                kids.sort_by(|a, b| a.left.total_cmp(&b.left));
                for pair in kids.windows(2) {
                    prop_assert!(pair[0].right() <= pair[1].left + 1e-3);
                }
            }
        }
    }
}

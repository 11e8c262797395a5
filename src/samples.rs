//! Built-in sample charts that can be quickly loaded from the UI.
//!
//! The samples cover a small single tree and a forest that exercises
//! independent nodes, locks and groups.

use crate::error::ChartError;
use crate::geometry::MeasuredSizes;
use crate::store::OrgChart;
use crate::types::*;

/// Kinds of built-in samples available from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// One faculty with three departments
    SmallFaculty,
    /// Two root trees, an independent committee and a grouped pair
    University,
}

/// Metadata for a single sample.
pub struct SampleInfo {
    /// Stable identifier for the sample
    pub kind: SampleKind,
    /// Human-friendly display name
    pub name: &'static str,
}

/// Returns all samples with their display names.
pub const fn all_samples() -> &'static [SampleInfo] {
    const SAMPLES: &[SampleInfo] = &[
        SampleInfo {
            kind: SampleKind::SmallFaculty,
            name: "Small Faculty",
        },
        SampleInfo {
            kind: SampleKind::University,
            name: "University (forest, groups, independent)",
        },
    ];
    SAMPLES
}

/// Builds the chart for the given sample kind.
pub fn build_sample(kind: SampleKind) -> Result<OrgChart, ChartError> {
    match kind {
        SampleKind::SmallFaculty => build_small_faculty(),
        SampleKind::University => build_university(),
    }
}

fn dept(name: &str, members: &[(MemberType, &str, &str)]) -> NodeFields {
    members
        .iter()
        .fold(NodeFields::named(name), |fields, (kind, position, person)| {
            fields.with_member(Member::new(*kind, *position, *person))
        })
}

fn build_small_faculty() -> Result<OrgChart, ChartError> {
    use MemberType::{Faculty, Staff};

    let mut chart = OrgChart::new();
    chart.header.title = "Faculty of Engineering".into();

    let dean = chart.create_root(dept("Dean's Office", &[(Faculty, "Dean", "Kim Minjun")]));
    chart.create_child(
        &dean,
        dept(
            "Computer Science",
            &[(Faculty, "Chair", "Lee Seoyeon"), (Staff, "Coordinator", "Park Jiho")],
        ),
    )?;
    chart.create_child(
        &dean,
        dept("Mechanical Engineering", &[(Faculty, "Chair", "Choi Yuna")]),
    )?;
    chart.create_child(
        &dean,
        dept(
            "Administration",
            &[(Staff, "Manager", "Jung Hana"), (Staff, "Clerk", "Kang Doyun")],
        ),
    )?;

    let sizes = MeasuredSizes::new(chart.settings.member_gap);
    chart.auto_layout(&sizes)?;
    Ok(chart)
}

fn build_university() -> Result<OrgChart, ChartError> {
    use MemberType::{Faculty, Staff};

    let mut chart = OrgChart::new();
    chart.header.title = "University Organization".into();
    chart.header.date = "2024. 3. 1.".into();

    let president = chart.create_root(dept("President", &[(Faculty, "President", "Han Jisoo")]));
    let academic = chart.create_child(&president, dept("Academic Affairs", &[(Faculty, "Vice President", "Yoon Seojun")]))?;
    let research = chart.create_child(&president, dept("Research Office", &[(Faculty, "Director", "Lim Chaewon")]))?;
    chart.create_child(&academic, dept("Registrar", &[(Staff, "Registrar", "Shin Eunwoo")]))?;
    let library = chart.create_child(&academic, dept("Library", &[(Staff, "Librarian", "Oh Haeun")]))?;
    let lab = chart.create_child(&research, dept("Central Lab", &[(Staff, "Technician", "Seo Minho")]))?;

    let foundation = chart.create_root(dept("Foundation", &[(Staff, "Chair", "Hwang Sumin")]));
    let fund_office = chart.create_child(&foundation, dept("Fund Office", &[(Staff, "Accountant", "Bae Jiwon")]))?;

    let committee = chart.create_child(
        &president,
        dept("Audit Committee", &[(Faculty, "Chair", "Song Yerin")]),
    )?;
    chart.set_independent(&committee, true)?;
    chart.move_node(&committee, 1750.0, 100.0)?;

    let sizes = MeasuredSizes::new(chart.settings.member_gap);
    chart.auto_layout(&sizes)?;

    // The fund office hangs next to the lab and keeps that offset on relayout.
    let lab_pos = chart.get(&lab).map(Node::position).unwrap_or_default();
    chart.move_node(&fund_office, lab_pos.x + 220.0, lab_pos.y)?;
    chart.set_locked(&library, true)?;
    chart.create_group(&[lab, fund_office])?;
    Ok(chart)
}

// This file is part of Metropolis-Freight.
// Copyright © 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Rules restricting the mode / means transfers allowed at the real nodes.
use hashbrown::HashMap;

use super::RealNodeId;
use crate::logging::{send_warning_at_most_n_times, WarningType};

/// Raw value representing a wildcard in rule rows.
const ANY: i64 = -1;

/// Number of values in a raw rule row.
const ROW_LENGTH: usize = 7;

/// A rule field: either a wildcard or a specific value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter<T> {
    #[default]
    Any,
    Specific(T),
}

impl<T: PartialEq> Filter<T> {
    /// Returns `true` if the filter is a wildcard or is equal to the value.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Specific(v) => v == value,
        }
    }
}

impl Filter<u32> {
    /// Reads a filter from a raw value, `-1` being the wildcard.
    fn from_raw(value: i64) -> Option<Self> {
        if value == ANY {
            Some(Self::Any)
        } else {
            u32::try_from(value).ok().map(Self::Specific)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    /// The transfers matching the rule are the only ones allowed at the node.
    Inclusion,
    /// The transfers matching the rule are forbidden at the node.
    Exclusion,
}

/// A transfer from (`mode1`, `means1`) to (`mode2`, `means2`) at a real node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub mode1: u32,
    pub means1: u32,
    pub mode2: u32,
    pub means2: u32,
}

impl Transition {
    pub const fn new(mode1: u32, means1: u32, mode2: u32, means2: u32) -> Self {
        Transition {
            mode1,
            means1,
            mode2,
            means2,
        }
    }

    /// Returns `true` if the mode and the means do not change.
    pub fn is_transit(&self) -> bool {
        self.mode1 == self.mode2 && self.means1 == self.means2
    }
}

/// An inclusion or exclusion rule at a real node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRule {
    pub kind: RuleKind,
    pub scenario: Filter<u32>,
    pub group: Filter<u32>,
    pub mode1: Filter<u32>,
    pub means1: Filter<u32>,
    pub mode2: Filter<u32>,
    pub means2: Filter<u32>,
}

impl NodeRule {
    /// Creates a rule matching everything.
    pub const fn any(kind: RuleKind) -> Self {
        NodeRule {
            kind,
            scenario: Filter::Any,
            group: Filter::Any,
            mode1: Filter::Any,
            means1: Filter::Any,
            mode2: Filter::Any,
            means2: Filter::Any,
        }
    }

    /// Returns `true` if the rule is relevant for the scenario and the group.
    pub fn applies_to(&self, scenario: u32, group: u32) -> bool {
        self.scenario.matches(&scenario) && self.group.matches(&group)
    }

    /// Returns `true` if the four mode / means filters match the transition.
    pub fn matches(&self, t: &Transition) -> bool {
        self.mode1.matches(&t.mode1)
            && self.means1.matches(&t.means1)
            && self.mode2.matches(&t.mode2)
            && self.means2.matches(&t.means2)
    }

    /// Returns `true` if this is an exclusion rule forbidding the transition.
    ///
    /// Pure transit is never excluded.
    pub fn is_excluded(&self, scenario: u32, group: u32, t: &Transition) -> bool {
        self.kind == RuleKind::Exclusion
            && !t.is_transit()
            && self.applies_to(scenario, group)
            && self.matches(t)
    }

    /// Returns `true` if this is an inclusion rule allowing the transition.
    ///
    /// Pure transit is always included.
    pub fn is_included(&self, scenario: u32, group: u32, t: &Transition) -> bool {
        t.is_transit()
            || (self.kind == RuleKind::Inclusion
                && self.applies_to(scenario, group)
                && self.matches(t))
    }
}

/// The rules of one real node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRules {
    rules: Vec<NodeRule>,
}

impl NodeRules {
    pub fn push(&mut self, rule: NodeRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[NodeRule] {
        &self.rules
    }

    /// Returns `true` if the transition is allowed at the node.
    ///
    /// When at least one inclusion rule applies to the scenario and group, the transition must
    /// match one of them. Any matching exclusion rule forbids the transition.
    pub fn is_permitted(&self, scenario: u32, group: u32, t: &Transition) -> bool {
        if t.is_transit() {
            return true;
        }
        if self.rules.iter().any(|r| r.is_excluded(scenario, group, t)) {
            return false;
        }
        let mut inclusions = self
            .rules
            .iter()
            .filter(|r| r.kind == RuleKind::Inclusion && r.applies_to(scenario, group))
            .peekable();
        inclusions.peek().is_none() || inclusions.any(|r| r.matches(t))
    }
}

/// The rules of all the real nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleBook {
    nodes: HashMap<RealNodeId, NodeRules>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: RealNodeId, rule: NodeRule) {
        self.nodes.entry(node).or_default().push(rule);
    }

    /// Returns the rules of a node, if it has any.
    pub fn node_rules(&self, node: RealNodeId) -> Option<&NodeRules> {
        self.nodes.get(&node)
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the transition is allowed at the real node (always `true` for nodes
    /// without rules).
    pub fn is_permitted(
        &self,
        node: RealNodeId,
        scenario: u32,
        group: u32,
        t: &Transition,
    ) -> bool {
        self.nodes
            .get(&node)
            .map_or(true, |rules| rules.is_permitted(scenario, group, t))
    }

    /// Builds the rule book from raw rows `node, scenario, group, mode1, means1, mode2, means2`.
    ///
    /// A `None` value represents a value that is not an integer. The value `-1` is a wildcard
    /// and a negative node id denotes an exclusion rule at the node with the opposite id.
    /// Malformed rows are skipped with a warning.
    pub fn from_rows<R: AsRef<[Option<i64>]>>(rows: &[R]) -> Self {
        let mut book = RuleBook::new();
        for (i, row) in rows.iter().enumerate() {
            match parse_row(row.as_ref()) {
                Some((node, rule)) => book.insert(node, rule),
                None => send_warning_at_most_n_times(
                    WarningType::InvalidRule,
                    &format!("Skipping invalid rule at row {i}: {:?}", row.as_ref()),
                    10,
                ),
            }
        }
        book
    }
}

fn parse_row(row: &[Option<i64>]) -> Option<(RealNodeId, NodeRule)> {
    if row.len() != ROW_LENGTH {
        return None;
    }
    let values: Vec<i64> = row.iter().copied().collect::<Option<_>>()?;
    let (node, kind) = if values[0] < 0 {
        (values[0].unsigned_abs(), RuleKind::Exclusion)
    } else {
        (values[0] as u64, RuleKind::Inclusion)
    };
    let rule = NodeRule {
        kind,
        scenario: Filter::from_raw(values[1])?,
        group: Filter::from_raw(values[2])?,
        mode1: Filter::from_raw(values[3])?,
        means1: Filter::from_raw(values[4])?,
        mode2: Filter::from_raw(values[5])?,
        means2: Filter::from_raw(values[6])?,
    };
    Some((node, rule))
}

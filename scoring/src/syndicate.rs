//! Procurement-network collusion density.
//!
//! Looks only at contractors and the `related` links between them. Density
//! is scaled by 1.5 and capped at 100.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Density multiplier applied before clamping to 100.
pub const DENSITY_SCALE: f64 = 150.0;

/// Role of a node in the tender network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Contractor,
    Official,
    Shell,
}

/// Relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Bid,
    Won,
    Related,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct NetworkNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

/// Read-only snapshot of a tender's participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TenderNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SyndicateScore {
    /// Collusion risk (0 - 100)
    pub score: u8,
    /// Related-edge density among contractors (0.0 - 1.0)
    pub density: f64,
    pub contractors: usize,
    pub related_links: usize,
    pub explanation: String,
}

/// Score a tender network.
pub fn compute_syndicate_score(network: &TenderNetwork) -> SyndicateScore {
    let contractors: HashMap<&str, &NetworkNode> = network
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Contractor)
        .map(|n| (n.id.as_str(), n))
        .collect();
    let n = contractors.len();

    if n < 2 {
        return SyndicateScore {
            score: 0,
            density: 0.0,
            contractors: n,
            related_links: 0,
            explanation: format!("{} contractor(s); no syndicate possible", n),
        };
    }

    // One link per unordered contractor pair.
    let links: HashSet<(&str, &str)> = network
        .edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Related && e.source != e.target)
        .filter(|e| {
            contractors.contains_key(e.source.as_str()) && contractors.contains_key(e.target.as_str())
        })
        .map(|e| {
            if e.source <= e.target {
                (e.source.as_str(), e.target.as_str())
            } else {
                (e.target.as_str(), e.source.as_str())
            }
        })
        .collect();

    let related_links = links.len();
    let density = (related_links * 2) as f64 / (n * (n - 1)) as f64;
    let score = (density * DENSITY_SCALE).round().min(100.0) as u8;

    let riskiest = contractors
        .values()
        .max_by(|a, b| a.risk_score.total_cmp(&b.risk_score))
        .map(|node| node.id.as_str())
        .unwrap_or_default();

    debug!(contractors = n, related_links, density, score, "Scored tender network");

    SyndicateScore {
        score,
        density,
        contractors: n,
        related_links,
        explanation: format!(
            "{} related link(s) among {} contractors (density {:.2}); highest-risk contractor {}",
            related_links, n, density, riskiest
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType) -> NetworkNode {
        NetworkNode {
            id: id.to_string(),
            node_type,
            risk_score: 0.0,
        }
    }

    fn edge(source: &str, target: &str, edge_type: EdgeType) -> NetworkEdge {
        NetworkEdge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
        }
    }

    #[test]
    fn test_single_contractor() {
        let network = TenderNetwork {
            nodes: vec![node("c1", NodeType::Contractor), node("o1", NodeType::Official)],
            edges: vec![edge("c1", "o1", EdgeType::Related)],
        };
        assert_eq!(compute_syndicate_score(&network).score, 0);
    }

    #[test]
    fn test_two_linked_contractors_saturate() {
        let network = TenderNetwork {
            nodes: vec![node("c1", NodeType::Contractor), node("c2", NodeType::Contractor)],
            edges: vec![
                edge("c1", "c2", EdgeType::Related),
                edge("c2", "c1", EdgeType::Related),
            ],
        };
        let result = compute_syndicate_score(&network);
        assert_eq!(result.density, 1.0);
        assert_eq!(result.score, 100);
        assert_eq!(result.related_links, 1);
    }

    #[test]
    fn test_only_contractor_related_edges_count() {
        let network = TenderNetwork {
            nodes: vec![
                node("c1", NodeType::Contractor),
                node("c2", NodeType::Contractor),
                node("c3", NodeType::Contractor),
                node("s1", NodeType::Shell),
            ],
            edges: vec![
                edge("c1", "c2", EdgeType::Related),
                edge("c1", "c3", EdgeType::Bid),
                edge("c2", "s1", EdgeType::Related),
                edge("c3", "c3", EdgeType::Related),
            ],
        };
        let result = compute_syndicate_score(&network);
        // 1 link over 3 pairs -> 0.333 x 150 = 50
        assert_eq!(result.related_links, 1);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "nodes": [{"id": "c1", "type": "contractor", "risk_score": 0.4}],
            "edges": [{"source": "c1", "target": "c1", "type": "won"}]
        }"#;
        let network: TenderNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(network.nodes[0].node_type, NodeType::Contractor);
        assert_eq!(network.edges[0].edge_type, EdgeType::Won);
    }
}

//! Constants used throughout proctree-merge.

/// Label of the process-model document root.
pub const ROOT_LABEL: &str = "description";

/// Labels of control-flow nodes. Every other label is a property node.
pub const CONTROL_FLOW_LABELS: &[&str] = &[
    "call",
    "manipulate",
    "parallel",
    "parallel_branch",
    "choose",
    "alternative",
    "otherwise",
    "loop",
    "critical",
    "stop",
    "escape",
    "terminate",
    "root",
    ROOT_LABEL,
];

/// Attributes stripped from parsed documents before diffing.
pub const IGNORED_ATTRIBUTES: &[&str] = &["id", "description"];

/// Default threshold below which two leaves are accepted as a match.
pub const DEFAULT_LEAF_THRESHOLD: f64 = 0.25;

/// Default threshold below which two inner nodes are accepted as a match.
pub const DEFAULT_INNER_THRESHOLD: f64 = 0.25;

/// Weight of content similarity in the comparator.
pub const CONTENT_WEIGHT: f64 = 0.9;

/// Weight of structural (parent label) similarity in the comparator.
pub const STRUCTURE_WEIGHT: f64 = 0.1;

/// Weight of `compare()` in the inner-node cost of bucketed matching.
pub const INNER_COMPARE_WEIGHT: f64 = 0.4;

/// Weight of descendant overlap in the inner-node cost of bucketed matching.
pub const INNER_OVERLAP_WEIGHT: f64 = 0.6;

/// Weight of the child assignment cost when the exact matcher scores inner pairs.
pub const EXACT_CHILDREN_WEIGHT: f64 = 0.7;

/// Weight of `compare()` when the exact matcher scores inner pairs.
pub const EXACT_COMPARE_WEIGHT: f64 = 0.3;

/// Reserved update key for a node's text payload.
pub const TEXT_KEY: &str = "text";

/// Reserved update key for a node's label. Not a valid XML name, so it
/// never shadows an attribute.
pub const LABEL_KEY: &str = "#label";

/// `upd:` attribute carrying the previous label of a relabeled element.
pub const RELABEL_ATTR: &str = "_label";

/// Attribute carrying a call's service endpoint.
pub const ENDPOINT_ATTR: &str = "endpoint";

/// Attribute carrying a parallel's wait count.
pub const WAIT_ATTR: &str = "wait";

/// Property label holding a call's HTTP method.
pub const METHOD_LABEL: &str = "method";

/// Property label (or attribute) holding a node's display label.
pub const DISPLAY_LABEL: &str = "label";

/// Prefix of a data-variable reference inside code and conditions.
pub const DATA_PREFIX: &str = "data.";

/// Default namespace of process-model documents.
pub const PROCESS_NS: &str = "http://cpee.org/ns/description/1.0";

/// Namespace prefixes and URIs used when serializing delta trees.
pub const INSERT_NS: (&str, &str) = ("ins", "urn:proctree:delta:insert");
/// Deleted elements and attributes.
pub const DELETE_NS: (&str, &str) = ("del", "urn:proctree:delta:delete");
/// Move origins.
pub const MOVE_FROM_NS: (&str, &str) = ("mvf", "urn:proctree:delta:move-from");
/// Move targets.
pub const MOVE_TO_NS: (&str, &str) = ("mvt", "urn:proctree:delta:move-to");
/// Updated attributes and the text-update marker.
pub const UPDATE_NS: (&str, &str) = ("upd", "urn:proctree:delta:update");

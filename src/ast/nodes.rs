use crate::value::Value;

/// A node in the operation tree.
///
/// The tree is built by the parser, immutable afterwards, and walked
/// read-only by the evaluator. Variants come in families:
///
/// - *Projection* nodes (`ProjectArray`, `ProjectObject`, `FlattenProject`,
///   `FilterProject`) carry a body that is applied to every element, with
///   `Null` results dropped.
/// - *Pruner* nodes (`PruneArray`, `ObjectValues`, `Flatten`, `Filter`) are
///   the same operators parsed without a body; they return the input-like
///   shape directly.
/// - `*Current` variants operate on the current value instead of an
///   evaluated child, avoiding an allocated `Current` node in the common
///   case.
/// - Built-in functions get one variant each, with their arity fixed in the
///   variant shape so the evaluator never re-checks argument counts.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals and context
    Bool(bool),
    Null,
    Literal(Value),
    Current,
    Root,
    Variable(String),

    // Field and index access
    Field(String),
    PipeField {
        left: Box<Node>,
        field: String,
    },
    Index {
        child: Box<Node>,
        index: i64,
    },
    IndexCurrent {
        index: i64,
    },
    /// Compact form of `IndexCurrent` for indexes in `0..=255`.
    SmallIndexCurrent(u8),

    // Slices
    Slice {
        child: Box<Node>,
        start: i64,
        stop: i64,
    },
    SliceCurrent {
        start: i64,
        stop: i64,
    },
    SliceStep {
        child: Box<Node>,
        start: i64,
        stop: i64,
        step: i64,
    },
    SliceStepCurrent {
        start: i64,
        stop: i64,
        step: i64,
    },

    // Projections
    ProjectArray {
        left: Box<Node>,
        right: Box<Node>,
    },
    ProjectArrayCurrent {
        right: Box<Node>,
    },
    ProjectObject {
        left: Box<Node>,
        right: Box<Node>,
    },
    ProjectObjectCurrent {
        right: Box<Node>,
    },
    FlattenProject {
        left: Box<Node>,
        right: Box<Node>,
    },
    FlattenProjectCurrent {
        right: Box<Node>,
    },
    FilterProject {
        left: Box<Node>,
        filter: Box<Node>,
        right: Box<Node>,
    },
    FilterProjectCurrent {
        filter: Box<Node>,
        right: Box<Node>,
    },

    // Pruners
    PruneArray {
        child: Box<Node>,
    },
    PruneArrayCurrent,
    ObjectValues {
        child: Box<Node>,
    },
    ObjectValuesCurrent,
    Flatten {
        child: Box<Node>,
    },
    FlattenCurrent,
    Filter {
        child: Box<Node>,
        filter: Box<Node>,
    },
    FilterCurrent {
        filter: Box<Node>,
    },

    // Multiselect
    SelectArray {
        child: Box<Node>,
        fields: Vec<Node>,
    },
    SelectArrayCurrent {
        fields: Vec<Node>,
    },
    SelectArraySingle {
        child: Box<Node>,
        field: Box<Node>,
    },
    SelectArraySingleCurrent {
        field: Box<Node>,
    },
    SelectObject {
        child: Box<Node>,
        fields: Vec<(String, Node)>,
    },
    SelectObjectCurrent {
        fields: Vec<(String, Node)>,
    },
    SelectObjectSingle {
        child: Box<Node>,
        key: String,
        field: Box<Node>,
    },
    SelectObjectSingleCurrent {
        key: String,
        field: Box<Node>,
    },

    // Control
    Pipe {
        left: Box<Node>,
        right: Box<Node>,
    },
    And {
        left: Box<Node>,
        right: Box<Node>,
    },
    Or {
        left: Box<Node>,
        right: Box<Node>,
    },
    Not {
        child: Box<Node>,
    },
    /// Unary `+`: passes numbers through, anything else becomes `Null`.
    AssertNumber {
        child: Box<Node>,
    },
    Negate {
        child: Box<Node>,
    },

    // Arithmetic
    Add {
        left: Box<Node>,
        right: Box<Node>,
    },
    Subtract {
        left: Box<Node>,
        right: Box<Node>,
    },
    Multiply {
        left: Box<Node>,
        right: Box<Node>,
    },
    Divide {
        left: Box<Node>,
        right: Box<Node>,
    },
    IntegerDivide {
        left: Box<Node>,
        right: Box<Node>,
    },
    Modulo {
        left: Box<Node>,
        right: Box<Node>,
    },

    // Comparison
    Equal {
        left: Box<Node>,
        right: Box<Node>,
    },
    NotEqual {
        left: Box<Node>,
        right: Box<Node>,
    },
    Less {
        left: Box<Node>,
        right: Box<Node>,
    },
    LessOrEqual {
        left: Box<Node>,
        right: Box<Node>,
    },
    Greater {
        left: Box<Node>,
        right: Box<Node>,
    },
    GreaterOrEqual {
        left: Box<Node>,
        right: Box<Node>,
    },

    // Let bindings
    DefineVariables {
        bindings: Vec<(String, Node)>,
        child: Box<Node>,
    },

    // Built-in functions, one variant per arity-resolved form
    Abs(Box<Node>),
    Avg(Box<Node>),
    Ceil(Box<Node>),
    Contains(Box<[Node; 2]>),
    EndsWith(Box<[Node; 2]>),
    FindFirst(Box<[Node; 2]>),
    FindFirstFrom(Box<[Node; 3]>),
    FindFirstBetween(Box<[Node; 4]>),
    FindLast(Box<[Node; 2]>),
    FindLastFrom(Box<[Node; 3]>),
    FindLastBetween(Box<[Node; 4]>),
    Floor(Box<Node>),
    FromItems(Box<Node>),
    GroupBy(Box<[Node; 2]>),
    Items(Box<Node>),
    Join(Box<[Node; 2]>),
    Keys(Box<Node>),
    Length(Box<Node>),
    Lower(Box<Node>),
    Map(Box<[Node; 2]>),
    Max(Box<Node>),
    MaxBy(Box<[Node; 2]>),
    Merge(Vec<Node>),
    Min(Box<Node>),
    MinBy(Box<[Node; 2]>),
    NotNull(Vec<Node>),
    NotNullDefault {
        argument: Box<Node>,
        default: Value,
    },
    PadLeft(Box<[Node; 3]>),
    PadRight(Box<[Node; 3]>),
    PadSpaceLeft(Box<[Node; 2]>),
    PadSpaceRight(Box<[Node; 2]>),
    Replace(Box<[Node; 3]>),
    ReplaceCount(Box<[Node; 4]>),
    Reverse(Box<Node>),
    Sort(Box<Node>),
    SortBy(Box<[Node; 2]>),
    Split(Box<[Node; 2]>),
    SplitCount(Box<[Node; 3]>),
    StartsWith(Box<[Node; 2]>),
    Sum(Box<Node>),
    ToArray(Box<Node>),
    ToNumber(Box<Node>),
    ToString(Box<Node>),
    Trim(Box<[Node; 2]>),
    TrimLeft(Box<[Node; 2]>),
    TrimRight(Box<[Node; 2]>),
    TrimSpace(Box<Node>),
    TrimSpaceLeft(Box<Node>),
    TrimSpaceRight(Box<Node>),
    Type(Box<Node>),
    Upper(Box<Node>),
    Values(Box<Node>),
    Zip(Vec<Node>),
}

/// True for array-projecting nodes. A `.field` continuation after one of
/// these stays inside the projection instead of becoming a pipe.
pub fn is_project_node(node: &Node) -> bool {
    matches!(
        node,
        Node::FilterProject { .. }
            | Node::FilterProjectCurrent { .. }
            | Node::FlattenProject { .. }
            | Node::FlattenProjectCurrent { .. }
            | Node::ProjectArray { .. }
            | Node::ProjectArrayCurrent { .. }
    )
}

/// True for slice-form nodes. A projection whose left side is a slice that
/// produced a string pipes its body instead of projecting it.
pub fn is_slice_node(node: &Node) -> bool {
    matches!(
        node,
        Node::Slice { .. }
            | Node::SliceCurrent { .. }
            | Node::SliceStep { .. }
            | Node::SliceStepCurrent { .. }
    )
}

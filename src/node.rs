use std::fmt::Display;

/// The closed vocabulary of expression nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    // logic
    And,
    Or,
    Not,
    Implies,
    Iff,
    True,
    False,
    ForAll,
    Exists,
    ExistsUnique,
    // sets
    Belongs,
    Included,
    Inter,
    Union,
    SetDiff,
    SetComplement,
    SetEmpty,
    SetImage,
    SetInverse,
    SetIntension,
    SetExtension,
    // arithmetic
    Sum,
    Diff,
    Mult,
    Div,
    Power,
    Minus,
    Number,
    // comparisons
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // types
    Set,
    Function,
    Sequence,
    SetFamily,
    Type,
    Prop,
    // functions
    Composite,
    Lambda,
    Application,
    // atoms
    LocalConstant,
    Constant,
    BoundVar,
    MetaVar,
}

const ALL: &[NodeKind] = &[
    NodeKind::And,
    NodeKind::Or,
    NodeKind::Not,
    NodeKind::Implies,
    NodeKind::Iff,
    NodeKind::True,
    NodeKind::False,
    NodeKind::ForAll,
    NodeKind::Exists,
    NodeKind::ExistsUnique,
    NodeKind::Belongs,
    NodeKind::Included,
    NodeKind::Inter,
    NodeKind::Union,
    NodeKind::SetDiff,
    NodeKind::SetComplement,
    NodeKind::SetEmpty,
    NodeKind::SetImage,
    NodeKind::SetInverse,
    NodeKind::SetIntension,
    NodeKind::SetExtension,
    NodeKind::Sum,
    NodeKind::Diff,
    NodeKind::Mult,
    NodeKind::Div,
    NodeKind::Power,
    NodeKind::Minus,
    NodeKind::Number,
    NodeKind::Equal,
    NodeKind::NotEqual,
    NodeKind::Less,
    NodeKind::LessEq,
    NodeKind::Greater,
    NodeKind::GreaterEq,
    NodeKind::Set,
    NodeKind::Function,
    NodeKind::Sequence,
    NodeKind::SetFamily,
    NodeKind::Type,
    NodeKind::Prop,
    NodeKind::Composite,
    NodeKind::Lambda,
    NodeKind::Application,
    NodeKind::LocalConstant,
    NodeKind::Constant,
    NodeKind::BoundVar,
    NodeKind::MetaVar,
];

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::Not => "NOT",
            NodeKind::Implies => "IMPLIES",
            NodeKind::Iff => "IFF",
            NodeKind::True => "TRUE",
            NodeKind::False => "FALSE",
            NodeKind::ForAll => "FORALL",
            NodeKind::Exists => "EXISTS",
            NodeKind::ExistsUnique => "EXISTS_UNIQUE",
            NodeKind::Belongs => "BELONGS",
            NodeKind::Included => "INCLUDED",
            NodeKind::Inter => "INTER",
            NodeKind::Union => "UNION",
            NodeKind::SetDiff => "SET_DIFF",
            NodeKind::SetComplement => "SET_COMPLEMENT",
            NodeKind::SetEmpty => "SET_EMPTY",
            NodeKind::SetImage => "SET_IMAGE",
            NodeKind::SetInverse => "SET_INVERSE",
            NodeKind::SetIntension => "SET_INTENSION",
            NodeKind::SetExtension => "SET_EXTENSION",
            NodeKind::Sum => "SUM",
            NodeKind::Diff => "DIFF",
            NodeKind::Mult => "MULT",
            NodeKind::Div => "DIV",
            NodeKind::Power => "POWER",
            NodeKind::Minus => "MINUS",
            NodeKind::Number => "NUMBER",
            NodeKind::Equal => "EQUAL",
            NodeKind::NotEqual => "NOT_EQUAL",
            NodeKind::Less => "<",
            NodeKind::LessEq => "≤",
            NodeKind::Greater => ">",
            NodeKind::GreaterEq => "≥",
            NodeKind::Set => "SET",
            NodeKind::Function => "FUNCTION",
            NodeKind::Sequence => "SEQUENCE",
            NodeKind::SetFamily => "SET_FAMILY",
            NodeKind::Type => "TYPE",
            NodeKind::Prop => "PROP",
            NodeKind::Composite => "COMPOSITE",
            NodeKind::Lambda => "LAMBDA",
            NodeKind::Application => "APPLICATION",
            NodeKind::LocalConstant => "LOCAL_CONSTANT",
            NodeKind::Constant => "CONSTANT",
            NodeKind::BoundVar => "BOUND_VAR",
            NodeKind::MetaVar => "METAVAR",
        }
    }

    /// Accepts both the canonical spelling and the one emitted by the prover.
    pub fn from_name(name: &str) -> Option<NodeKind> {
        let name = name.trim();
        if let Some(kind) = ALL.iter().find(|kind| kind.as_str() == name) {
            return Some(*kind);
        }
        let kind = match name {
            "PROP_AND" => NodeKind::And,
            "PROP_OR" => NodeKind::Or,
            "PROP_NOT" => NodeKind::Not,
            "PROP_IMPLIES" => NodeKind::Implies,
            "PROP_IFF" => NodeKind::Iff,
            "PROP_TRUE" => NodeKind::True,
            "PROP_FALSE" => NodeKind::False,
            "QUANT_∀" => NodeKind::ForAll,
            "QUANT_∃" => NodeKind::Exists,
            "QUANT_∃!" => NodeKind::ExistsUnique,
            "PROP_BELONGS" => NodeKind::Belongs,
            "PROP_INCLUDED" => NodeKind::Included,
            "SET_INTER" => NodeKind::Inter,
            "SET_UNION" => NodeKind::Union,
            "SET_DIFF" => NodeKind::SetDiff,
            "SET_COMPLEMENT" => NodeKind::SetComplement,
            "SET_EMPTY" => NodeKind::SetEmpty,
            "DIFFERENCE" => NodeKind::Diff,
            "PROP_EQUAL" => NodeKind::Equal,
            "PROP_EQUAL_NOT" => NodeKind::NotEqual,
            "PROP_<" => NodeKind::Less,
            "PROP_≤" => NodeKind::LessEq,
            "PROP_>" => NodeKind::Greater,
            "PROP_≥" => NodeKind::GreaterEq,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_binder(&self) -> bool {
        matches!(
            self,
            NodeKind::ForAll
                | NodeKind::Exists
                | NodeKind::ExistsUnique
                | NodeKind::Lambda
                | NodeKind::SetIntension
        )
    }

    pub fn is_quantifier(&self) -> bool {
        matches!(
            self,
            NodeKind::ForAll | NodeKind::Exists | NodeKind::ExistsUnique
        )
    }

    /// Leaves of the vocabulary; they never carry children.
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            NodeKind::LocalConstant
                | NodeKind::Constant
                | NodeKind::BoundVar
                | NodeKind::MetaVar
                | NodeKind::Number
                | NodeKind::Type
                | NodeKind::Prop
                | NodeKind::True
                | NodeKind::False
                | NodeKind::SetEmpty
        )
    }

    /// Kinds whose values are propositions.
    pub fn is_proposition(&self) -> bool {
        matches!(
            self,
            NodeKind::And
                | NodeKind::Or
                | NodeKind::Not
                | NodeKind::Implies
                | NodeKind::Iff
                | NodeKind::True
                | NodeKind::False
                | NodeKind::ForAll
                | NodeKind::Exists
                | NodeKind::ExistsUnique
                | NodeKind::Belongs
                | NodeKind::Included
                | NodeKind::Equal
                | NodeKind::NotEqual
                | NodeKind::Less
                | NodeKind::LessEq
                | NodeKind::Greater
                | NodeKind::GreaterEq
        )
    }

    /// Kinds whose values are functions in a broad sense: they can be applied.
    pub fn is_function_type(&self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Sequence | NodeKind::SetFamily
        )
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(
            self,
            NodeKind::Not | NodeKind::Minus | NodeKind::SetComplement
        )
    }

    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            NodeKind::And
                | NodeKind::Or
                | NodeKind::Implies
                | NodeKind::Iff
                | NodeKind::Belongs
                | NodeKind::Included
                | NodeKind::Inter
                | NodeKind::Union
                | NodeKind::SetDiff
                | NodeKind::Sum
                | NodeKind::Diff
                | NodeKind::Mult
                | NodeKind::Div
                | NodeKind::Power
                | NodeKind::Equal
                | NodeKind::NotEqual
                | NodeKind::Less
                | NodeKind::LessEq
                | NodeKind::Greater
                | NodeKind::GreaterEq
                | NodeKind::Composite
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for kind in ALL {
            assert_eq!(NodeKind::from_name(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn prover_spelling_is_accepted() {
        assert_eq!(NodeKind::from_name("QUANT_∀"), Some(NodeKind::ForAll));
        assert_eq!(NodeKind::from_name("PROP_EQUAL_NOT"), Some(NodeKind::NotEqual));
        assert_eq!(NodeKind::from_name(" PROP_AND "), Some(NodeKind::And));
        assert_eq!(NodeKind::from_name("FOO"), None);
    }
}

pub mod field;
pub mod form;

pub use field::{
    ChoiceDefinition, ConditionDefinition, Constraint, FieldDefinition, GroupDefinition,
    ItemDefinition, NormalizerKind, RepeatWhile, SubformDefinition,
};
pub use form::{FormDefinition, schema};

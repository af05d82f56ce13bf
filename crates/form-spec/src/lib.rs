#![allow(missing_docs)]

pub mod condition;
pub mod definition;
pub mod discovery;
pub mod error;
pub mod field;
pub mod form;
pub mod group;
pub mod prompt;
pub mod result;

pub use condition::{Condition, Operator, evaluate, resolve};
pub use definition::{FieldDefinition, FormDefinition, GroupDefinition, ItemDefinition};
pub use discovery::{Discovery, DiscoveryError, FormRegistry};
pub use error::{FormError, PromptError};
pub use field::{DataType, Field, FieldKind, Question};
pub use form::Form;
pub use group::{FieldGroup, FormItem};
pub use prompt::{Prompter, ScriptedPrompter, ask_with_retries};
pub use result::{Answer, ResultTree, ResultValue};

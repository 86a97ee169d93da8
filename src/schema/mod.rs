pub mod registry;

pub use registry::{
    builtin_registry, Domain, FieldSpec, FieldType, OperationKind, OperationSchema,
    SchemaRegistry,
};

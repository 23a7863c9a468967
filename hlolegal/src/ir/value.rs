use crate::ir::Type;
use crate::shared::Shared;
use crate::shared::SharedExt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

/// An SSA value.
///
/// Operands hold a [Shared] pointer to the value that defines them, so a
/// rewrite that changes the type of a value is visible to every user.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An argument of a block (for example, `%arg0` in `^bb0(%arg0: f32)`).
    BlockArgument { name: String, typ: Type },
    /// A result of an operation.
    OpResult { name: String, typ: Type },
}

impl Value {
    pub fn block_argument(name: &str, typ: Type) -> Shared<Value> {
        Shared::new(
            Value::BlockArgument {
                name: name.to_string(),
                typ,
            }
            .into(),
        )
    }
    pub fn op_result(name: &str, typ: Type) -> Shared<Value> {
        Shared::new(
            Value::OpResult {
                name: name.to_string(),
                typ,
            }
            .into(),
        )
    }
    pub fn name(&self) -> &str {
        match self {
            Value::BlockArgument { name, .. } => name,
            Value::OpResult { name, .. } => name,
        }
    }
    pub fn typ(&self) -> Type {
        match self {
            Value::BlockArgument { typ, .. } => typ.clone(),
            Value::OpResult { typ, .. } => typ.clone(),
        }
    }
    pub fn set_typ(&mut self, new: Type) {
        match self {
            Value::BlockArgument { typ, .. } => *typ = new,
            Value::OpResult { typ, .. } => *typ = new,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An ordered list of values such as the operands or results of an operation.
#[derive(Clone, Debug, Default)]
pub struct Values {
    values: Vec<Shared<Value>>,
}

impl Values {
    pub fn from_vec(values: Vec<Shared<Value>>) -> Self {
        Self { values }
    }
    pub fn vec(&self) -> &Vec<Shared<Value>> {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&Shared<Value>> {
        self.values.get(index)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Shared<Value>> {
        self.values.iter()
    }
    pub fn types(&self) -> Vec<Type> {
        self.values.iter().map(|value| value.rd().typ()).collect()
    }
    pub fn contains(&self, value: &Shared<Value>) -> bool {
        self.values.iter().any(|v| Arc::ptr_eq(v, value))
    }
    /// Print the values as `%a: f32, %b: f32`.
    pub fn display_with_types(&self) -> String {
        self.values
            .iter()
            .map(|value| {
                let value = value.rd();
                format!("{}: {}", value.name(), value.typ())
            })
            .collect::<Vec<String>>()
            .join(", ")
    }
}

impl Display for Values {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = self
            .values
            .iter()
            .map(|value| value.rd().name().to_string())
            .collect::<Vec<String>>();
        write!(f, "{}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values() {
        let a = Value::block_argument("%arg0", Type::f32());
        let b = Value::op_result("%0", Type::i64());
        let values = Values::from_vec(vec![a.clone(), b.clone()]);
        assert_eq!(values.to_string(), "%arg0, %0");
        assert_eq!(values.display_with_types(), "%arg0: f32, %0: i64");
        assert_eq!(values.types(), vec![Type::f32(), Type::i64()]);

        b.wr().set_typ(Type::f32());
        assert_eq!(values.types(), vec![Type::f32(), Type::f32()]);

        let lookalike = Value::block_argument("%arg0", Type::f32());
        assert!(values.contains(&a));
        assert!(!values.contains(&lookalike));
    }
}

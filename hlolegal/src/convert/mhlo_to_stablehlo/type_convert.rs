use crate::dialect::Namespace;
use crate::ir::FunctionType;
use crate::ir::TensorEncoding;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::ir::TypeConvert;

/// Converts MHLO types to StableHLO types.
///
/// Builtin types are unchanged apart from the types that they contain, which
/// are converted recursively. Conversion fails for types without StableHLO
/// counterpart such as `!mhlo.async_bundle`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HloToStablehloTypeConverter;

impl HloToStablehloTypeConverter {
    fn convert_encoding(&self, encoding: &TensorEncoding) -> TensorEncoding {
        TensorEncoding::new(Namespace::Stablehlo, encoding.bounds().to_vec())
    }
    fn convert_tensor(&self, tensor: &TensorType) -> Option<TensorType> {
        let element = self.convert_type(tensor.element())?;
        let encoding = tensor.encoding().map(|e| self.convert_encoding(e));
        Some(TensorType::new(tensor.shape().to_vec(), element, encoding))
    }
}

impl TypeConvert for HloToStablehloTypeConverter {
    fn convert_type(&self, typ: &Type) -> Option<Type> {
        match typ {
            Type::Token(_) => Some(Type::Token(Namespace::Stablehlo)),
            Type::AsyncBundle(_) => None,
            Type::Tensor(tensor) => Some(Type::Tensor(self.convert_tensor(tensor)?)),
            Type::Tuple(types) => Some(Type::Tuple(self.convert_types(types)?)),
            Type::Complex(element) => Some(Type::Complex(Box::new(self.convert_type(element)?))),
            Type::Function(function) => {
                let inputs = self.convert_types(function.inputs())?;
                let results = self.convert_types(function.results())?;
                Some(Type::Function(FunctionType::new(inputs, results)))
            }
            Type::Integer(_) | Type::Float(_) | Type::Index => Some(typ.clone()),
        }
    }
}

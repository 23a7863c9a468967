use crate::dialect::Namespace;
use crate::ir::display_dims;
use crate::parser::Cursor;
use crate::parser::Parser;
use crate::Dialect;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

/// Whether an integer type carries a sign (`si8`, `ui8`) or not (`i8`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

/// Represent an integer type such as `i32`, `si8`, or `ui16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerType {
    width: u32,
    signedness: Signedness,
}

impl IntegerType {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            signedness: Signedness::Signless,
        }
    }
    pub fn with_signedness(width: u32, signedness: Signedness) -> Self {
        Self { width, signedness }
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }
    /// Parse `i32`, `si32`, or `ui32`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (signedness, digits) = if let Some(rest) = s.strip_prefix("si") {
            (Signedness::Signed, rest)
        } else if let Some(rest) = s.strip_prefix("ui") {
            (Signedness::Unsigned, rest)
        } else if let Some(rest) = s.strip_prefix('i') {
            (Signedness::Signless, rest)
        } else {
            return None;
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let width = digits.parse::<u32>().ok()?;
        Some(Self { width, signedness })
    }
}

impl Display for IntegerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.signedness {
            Signedness::Signless => write!(f, "i{}", self.width),
            Signedness::Signed => write!(f, "si{}", self.width),
            Signedness::Unsigned => write!(f, "ui{}", self.width),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatType {
    F8E4M3FN,
    F8E5M2,
    BF16,
    F16,
    F32,
    F64,
}

impl FloatType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "f8E4M3FN" => Some(FloatType::F8E4M3FN),
            "f8E5M2" => Some(FloatType::F8E5M2),
            "bf16" => Some(FloatType::BF16),
            "f16" => Some(FloatType::F16),
            "f32" => Some(FloatType::F32),
            "f64" => Some(FloatType::F64),
            _ => None,
        }
    }
}

impl Display for FloatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FloatType::F8E4M3FN => "f8E4M3FN",
            FloatType::F8E5M2 => "f8E5M2",
            FloatType::BF16 => "bf16",
            FloatType::F16 => "f16",
            FloatType::F32 => "f32",
            FloatType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

/// Upper bounds for the dynamic dimensions of a tensor.
///
/// MHLO spells this `#mhlo.type_extensions<bounds = [4, ?]>` and StableHLO
/// spells it `#stablehlo.bounds<4, ?>`. A `None` bound is printed as `?`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorEncoding {
    namespace: Namespace,
    bounds: Vec<Option<i64>>,
}

impl TensorEncoding {
    pub fn new(namespace: Namespace, bounds: Vec<Option<i64>>) -> Self {
        Self { namespace, bounds }
    }
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
    pub fn bounds(&self) -> &[Option<i64>] {
        &self.bounds
    }
}

impl Display for TensorEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.namespace {
            Namespace::Mhlo => write!(
                f,
                "#mhlo.type_extensions<bounds = [{}]>",
                display_dims(&self.bounds, ", ")
            ),
            Namespace::Stablehlo => {
                write!(f, "#stablehlo.bounds<{}>", display_dims(&self.bounds, ", "))
            }
        }
    }
}

/// A ranked tensor type such as `tensor<4x?xf32>`.
///
/// Dynamic dimensions are stored as `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorType {
    shape: Vec<Option<i64>>,
    element: Box<Type>,
    encoding: Option<TensorEncoding>,
}

impl TensorType {
    pub fn new(shape: Vec<Option<i64>>, element: Type, encoding: Option<TensorEncoding>) -> Self {
        Self {
            shape,
            element: Box::new(element),
            encoding,
        }
    }
    pub fn shape(&self) -> &[Option<i64>] {
        &self.shape
    }
    pub fn element(&self) -> &Type {
        &self.element
    }
    pub fn encoding(&self) -> Option<&TensorEncoding> {
        self.encoding.as_ref()
    }
}

impl Display for TensorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tensor<")?;
        for dim in self.shape.iter() {
            match dim {
                Some(dim) => write!(f, "{dim}x")?,
                None => write!(f, "?x")?,
            }
        }
        write!(f, "{}", self.element)?;
        if let Some(encoding) = &self.encoding {
            write!(f, ", {encoding}")?;
        }
        write!(f, ">")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FunctionType {
    inputs: Vec<Type>,
    results: Vec<Type>,
}

impl FunctionType {
    pub fn new(inputs: Vec<Type>, results: Vec<Type>) -> Self {
        Self { inputs, results }
    }
    pub fn inputs(&self) -> &[Type] {
        &self.inputs
    }
    pub fn results(&self) -> &[Type] {
        &self.results
    }
}

/// Display a list of result types the way MLIR does: a single non-function
/// type goes without parentheses.
pub fn display_result_types(f: &mut Formatter<'_>, results: &[Type]) -> std::fmt::Result {
    match results {
        [single] if !matches!(single, Type::Function(_)) => write!(f, "{single}"),
        _ => write!(f, "({})", display_types(results)),
    }
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) -> ", display_types(&self.inputs))?;
        display_result_types(f, &self.results)
    }
}

/// The static type of a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Integer(IntegerType),
    Float(FloatType),
    Index,
    Complex(Box<Type>),
    Tensor(TensorType),
    Tuple(Vec<Type>),
    Function(FunctionType),
    /// `!mhlo.token` or `!stablehlo.token`.
    Token(Namespace),
    /// `!mhlo.async_bundle<...>`; StableHLO has no counterpart.
    AsyncBundle(Vec<Type>),
}

impl Type {
    pub fn tensor(shape: &[i64], element: Type) -> Self {
        let shape = shape.iter().map(|dim| Some(*dim)).collect();
        Type::Tensor(TensorType::new(shape, element, None))
    }
    pub fn f32() -> Self {
        Type::Float(FloatType::F32)
    }
    pub fn i64() -> Self {
        Type::Integer(IntegerType::new(64))
    }
    /// The dialect that owns this type, or `None` for builtin types.
    ///
    /// Only the outermost type is inspected.
    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            Type::Token(namespace) => Some(*namespace),
            Type::AsyncBundle(_) => Some(Namespace::Mhlo),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer(typ) => write!(f, "{typ}"),
            Type::Float(typ) => write!(f, "{typ}"),
            Type::Index => write!(f, "index"),
            Type::Complex(element) => write!(f, "complex<{element}>"),
            Type::Tensor(typ) => write!(f, "{typ}"),
            Type::Tuple(types) => write!(f, "tuple<{}>", display_types(types)),
            Type::Function(typ) => write!(f, "{typ}"),
            Type::Token(namespace) => write!(f, "!{}.token", namespace.name()),
            Type::AsyncBundle(types) => {
                write!(f, "!mhlo.async_bundle<{}>", display_types(types))
            }
        }
    }
}

pub fn display_types(types: &[Type]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// Interface to convert a type from one dialect to another.
///
/// Conversion returns `None` when the type has no representation in the
/// target dialect.
pub trait TypeConvert {
    fn convert_type(&self, typ: &Type) -> Option<Type>;
    /// Convert all types, or none of them.
    fn convert_types(&self, types: &[Type]) -> Option<Vec<Type>> {
        types.iter().map(|typ| self.convert_type(typ)).collect()
    }
}

impl Cursor<'_> {
    /// Read a type such as `tensor<4x?xf32>` or `(i32) -> !mhlo.token`.
    pub fn typ(&mut self) -> Result<Type> {
        self.skip_whitespace();
        match self.peek() {
            '(' => Ok(Type::Function(self.function_type()?)),
            '!' => {
                self.advance();
                let name = self.identifier();
                match name.as_str() {
                    "mhlo.token" => Ok(Type::Token(Namespace::Mhlo)),
                    "stablehlo.token" => Ok(Type::Token(Namespace::Stablehlo)),
                    "mhlo.async_bundle" => {
                        self.expect("<")?;
                        Ok(Type::AsyncBundle(self.type_list('>')?))
                    }
                    _ => Err(anyhow::anyhow!("Unknown dialect type: !{name}")),
                }
            }
            _ => {
                let name = self.identifier();
                match name.as_str() {
                    "tensor" => Ok(Type::Tensor(self.tensor_type()?)),
                    "tuple" => {
                        self.expect("<")?;
                        Ok(Type::Tuple(self.type_list('>')?))
                    }
                    "complex" => {
                        self.expect("<")?;
                        let element = self.typ()?;
                        self.expect(">")?;
                        Ok(Type::Complex(Box::new(element)))
                    }
                    "index" => Ok(Type::Index),
                    _ => {
                        if let Some(typ) = IntegerType::from_str(&name) {
                            Ok(Type::Integer(typ))
                        } else if let Some(typ) = FloatType::from_str(&name) {
                            Ok(Type::Float(typ))
                        } else {
                            Err(anyhow::anyhow!("Unknown type: {name}"))
                        }
                    }
                }
            }
        }
    }
    /// Read types separated by commas up to (and including) `close`.
    fn type_list(&mut self, close: char) -> Result<Vec<Type>> {
        let mut types = vec![];
        loop {
            self.skip_whitespace();
            if self.eat_char(close) {
                return Ok(types);
            }
            types.push(self.typ()?);
            if !self.eat(",") {
                self.expect(&close.to_string())?;
                return Ok(types);
            }
        }
    }
    fn function_type(&mut self) -> Result<FunctionType> {
        self.expect("(")?;
        let inputs = self.type_list(')')?;
        self.expect("->")?;
        self.skip_whitespace();
        let results = if self.eat_char('(') {
            self.type_list(')')?
        } else {
            vec![self.typ()?]
        };
        Ok(FunctionType::new(inputs, results))
    }
    fn tensor_type(&mut self) -> Result<TensorType> {
        self.expect("<")?;
        self.skip_whitespace();
        let mut shape = vec![];
        while self.peek().is_ascii_digit() || self.peek() == '?' {
            shape.push(self.dim()?);
            if !self.eat_char('x') {
                return Err(anyhow::anyhow!("Expected 'x' after dimension"));
            }
        }
        let element = self.typ()?;
        let encoding = if self.eat(",") {
            Some(self.tensor_encoding()?)
        } else {
            None
        };
        self.expect(">")?;
        Ok(TensorType::new(shape, element, encoding))
    }
    fn tensor_encoding(&mut self) -> Result<TensorEncoding> {
        self.expect("#")?;
        let name = self.identifier();
        match name.as_str() {
            "mhlo.type_extensions" => {
                self.expect("<")?;
                self.expect("bounds")?;
                self.expect("=")?;
                self.expect("[")?;
                let bounds = self.dims(']')?;
                self.expect(">")?;
                Ok(TensorEncoding::new(Namespace::Mhlo, bounds))
            }
            "stablehlo.bounds" => {
                self.expect("<")?;
                let bounds = self.dims('>')?;
                Ok(TensorEncoding::new(Namespace::Stablehlo, bounds))
            }
            _ => Err(anyhow::anyhow!("Unknown tensor encoding: #{name}")),
        }
    }
}

impl Parser {
    /// Parse a type at the current position.
    pub fn parse_type(&mut self) -> Result<Type> {
        let token = self.peek().clone();
        let mut cursor = self.cursor();
        let typ = cursor.typ();
        let end = cursor.pos();
        match typ {
            Ok(typ) => {
                self.skip_to(end);
                Ok(typ)
            }
            Err(e) => Err(anyhow::anyhow!(self.error(&token, &e.to_string()))),
        }
    }
    /// Parse a function type such as `(tensor<f32>) -> tensor<f32>`.
    pub fn parse_function_type(&mut self) -> Result<FunctionType> {
        let token = self.peek().clone();
        match self.parse_type()? {
            Type::Function(typ) => Ok(typ),
            typ => {
                let msg = format!("Expected function type, but got {typ}");
                Err(anyhow::anyhow!(self.error(&token, &msg)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let typ = Type::tensor(&[4, 8], Type::f32());
        assert_eq!(typ.to_string(), "tensor<4x8xf32>");

        let scalar = Type::tensor(&[], Type::Integer(IntegerType::new(1)));
        assert_eq!(scalar.to_string(), "tensor<i1>");

        let encoding = TensorEncoding::new(Namespace::Mhlo, vec![Some(4), None]);
        let bounded = TensorType::new(vec![None, Some(2)], Type::f32(), Some(encoding));
        assert_eq!(
            Type::Tensor(bounded).to_string(),
            "tensor<?x2xf32, #mhlo.type_extensions<bounds = [4, ?]>>"
        );

        let tuple = Type::Tuple(vec![Type::Token(Namespace::Mhlo), Type::Index]);
        assert_eq!(tuple.to_string(), "tuple<!mhlo.token, index>");

        let func = FunctionType::new(vec![Type::f32(), Type::f32()], vec![Type::f32()]);
        assert_eq!(func.to_string(), "(f32, f32) -> f32");
        let func = FunctionType::new(vec![], vec![]);
        assert_eq!(func.to_string(), "() -> ()");
        let func = FunctionType::new(vec![Type::i64()], vec![Type::i64(), Type::i64()]);
        assert_eq!(func.to_string(), "(i64) -> (i64, i64)");
    }

    fn parse(src: &str) -> Type {
        let chars = src.chars().collect::<Vec<char>>();
        let mut cursor = Cursor::new(&chars, 0);
        let typ = cursor.typ().unwrap();
        assert_eq!(cursor.pos(), chars.len(), "unparsed input in {src}");
        typ
    }

    #[test]
    fn test_parse() {
        let srcs = [
            "tensor<4x8xf32>",
            "tensor<i1>",
            "tensor<?x2xf32, #mhlo.type_extensions<bounds = [4, ?]>>",
            "tensor<?xf32, #stablehlo.bounds<4>>",
            "tuple<!mhlo.token, tensor<complex<f32>>>",
            "!mhlo.async_bundle<tensor<f32>, tensor<f32>>",
            "(tensor<f32>, ui8) -> (tensor<f32>, index)",
            "() -> ()",
            "tuple<>",
        ];
        for src in srcs {
            assert_eq!(parse(src).to_string(), src);
        }
        let typ = parse("tensor<4x?xbf16>");
        match typ {
            Type::Tensor(tensor) => {
                assert_eq!(tensor.shape(), &[Some(4), None]);
                assert_eq!(tensor.element(), &Type::Float(FloatType::BF16));
            }
            _ => panic!("expected tensor"),
        }
    }

    #[test]
    fn test_integer_type_from_str() {
        assert_eq!(IntegerType::from_str("i32"), Some(IntegerType::new(32)));
        let unsigned = IntegerType::with_signedness(8, Signedness::Unsigned);
        assert_eq!(IntegerType::from_str("ui8"), Some(unsigned));
        assert_eq!(IntegerType::from_str("index"), None);
        assert_eq!(IntegerType::from_str("i"), None);
    }
}

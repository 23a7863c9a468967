use crate::dialect::records::RecordAttr;
use crate::dialect::records::RecordKind;
use crate::dialect::records::RecordValue;
use crate::dialect::Namespace;
use crate::ir::escape;
use crate::ir::unescape;
use crate::ir::FloatType;
use crate::ir::IntegerType;
use crate::ir::Type;
use crate::parser::Parser;
use crate::parser::TokenKind;
use crate::Dialect;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

/// The enums that MHLO and StableHLO attributes can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnumKind {
    ComparisonDirection,
    ComparisonType,
    Precision,
    FftType,
    RngAlgorithm,
    RngDistribution,
    Transpose,
    CustomCallSchedule,
}

impl EnumKind {
    pub fn from_keyword(keyword: &str) -> Option<EnumKind> {
        match keyword {
            "comparison_direction" => Some(EnumKind::ComparisonDirection),
            "comparison_type" => Some(EnumKind::ComparisonType),
            "precision" => Some(EnumKind::Precision),
            "fft_type" => Some(EnumKind::FftType),
            "rng_algorithm" => Some(EnumKind::RngAlgorithm),
            "rng_distribution" => Some(EnumKind::RngDistribution),
            "transpose" => Some(EnumKind::Transpose),
            "custom_call_schedule" => Some(EnumKind::CustomCallSchedule),
            _ => None,
        }
    }
    pub fn keyword(&self) -> &'static str {
        match self {
            EnumKind::ComparisonDirection => "comparison_direction",
            EnumKind::ComparisonType => "comparison_type",
            EnumKind::Precision => "precision",
            EnumKind::FftType => "fft_type",
            EnumKind::RngAlgorithm => "rng_algorithm",
            EnumKind::RngDistribution => "rng_distribution",
            EnumKind::Transpose => "transpose",
            EnumKind::CustomCallSchedule => "custom_call_schedule",
        }
    }
}

/// An enum case such as `#mhlo<comparison_direction GT>`.
///
/// The value is the dialect-specific number of the case. Use
/// [Namespace::stringify] to get the symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumAttr {
    namespace: Namespace,
    kind: EnumKind,
    value: u32,
}

impl EnumAttr {
    pub fn new(namespace: Namespace, kind: EnumKind, value: u32) -> Self {
        Self {
            namespace,
            kind,
            value,
        }
    }
    pub fn from_symbol(namespace: Namespace, kind: EnumKind, symbol: &str) -> Option<Self> {
        let value = namespace.symbolize(kind, symbol)?;
        Some(Self::new(namespace, kind, value))
    }
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
    pub fn kind(&self) -> EnumKind {
        self.kind
    }
    pub fn value(&self) -> u32 {
        self.value
    }
    pub fn symbol(&self) -> Option<&'static str> {
        self.namespace.stringify(self.kind, self.value)
    }
}

impl Display for EnumAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let namespace = self.namespace.name();
        let keyword = self.kind.keyword();
        match self.symbol() {
            Some(symbol) => write!(f, "#{namespace}<{keyword} {symbol}>"),
            None => write!(f, "#{namespace}<{keyword} {}>", self.value),
        }
    }
}

/// An integer such as `42 : i64`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegerAttr {
    value: i64,
    typ: Type,
}

impl IntegerAttr {
    pub fn new(value: i64, typ: Type) -> Self {
        Self { value, typ }
    }
    pub fn i64(value: i64) -> Self {
        Self::new(value, Type::Integer(IntegerType::new(64)))
    }
    pub fn i32(value: i64) -> Self {
        Self::new(value, Type::Integer(IntegerType::new(32)))
    }
    pub fn value(&self) -> i64 {
        self.value
    }
    pub fn typ(&self) -> &Type {
        &self.typ
    }
}

impl Display for IntegerAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.value, self.typ)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatAttr {
    value: f64,
    typ: FloatType,
}

impl FloatAttr {
    pub fn new(value: f64, typ: FloatType) -> Self {
        Self { value, typ }
    }
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Print a float so that the scanner reads it back as a float literal.
fn display_float(value: f64) -> String {
    let text = format!("{value:?}");
    if text.contains('.') {
        text
    } else if let Some((mantissa, exponent)) = text.split_once('e') {
        format!("{mantissa}.0e{exponent}")
    } else {
        format!("{text}.0")
    }
}

impl Display for FloatAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", display_float(self.value), self.typ)
    }
}

/// The elements of a `dense<...>` attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum DenseValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
}

impl DenseValues {
    fn len(&self) -> usize {
        match self {
            DenseValues::Int(values) => values.len(),
            DenseValues::Float(values) => values.len(),
            DenseValues::Bool(values) => values.len(),
        }
    }
    fn element(&self, index: usize) -> String {
        match self {
            DenseValues::Int(values) => values[index].to_string(),
            DenseValues::Float(values) => display_float(values[index]),
            DenseValues::Bool(values) => values[index].to_string(),
        }
    }
    fn is_splat(&self) -> bool {
        if self.len() == 0 {
            return false;
        }
        let first = self.element(0);
        (1..self.len()).all(|i| self.element(i) == first)
    }
}

/// Arbitrary-precision tensor elements such as `dense<[1, 2]> : tensor<2xi64>`.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseElementsAttr {
    values: DenseValues,
    typ: Type,
}

impl DenseElementsAttr {
    pub fn new(values: DenseValues, typ: Type) -> Self {
        Self { values, typ }
    }
    pub fn values(&self) -> &DenseValues {
        &self.values
    }
    pub fn typ(&self) -> &Type {
        &self.typ
    }
    fn static_shape(&self) -> Option<Vec<i64>> {
        match &self.typ {
            Type::Tensor(tensor) => tensor.shape().iter().copied().collect(),
            _ => None,
        }
    }
    fn num_elements(&self) -> Option<usize> {
        let shape = self.static_shape()?;
        Some(shape.iter().product::<i64>() as usize)
    }
    /// All elements as integers, with splats expanded to the full shape.
    ///
    /// Returns `None` for non-integer elements.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        let values = match &self.values {
            DenseValues::Int(values) => values,
            _ => return None,
        };
        match self.num_elements() {
            Some(n) if values.len() == 1 && n != 1 => Some(vec![values[0]; n]),
            _ => Some(values.clone()),
        }
    }
    fn display_nested(&self, f: &mut Formatter<'_>, shape: &[i64], offset: usize) -> std::fmt::Result {
        match shape {
            [] => write!(f, "{}", self.values.element(offset)),
            [dim, rest @ ..] => {
                let stride = rest.iter().product::<i64>() as usize;
                write!(f, "[")?;
                for i in 0..(*dim as usize) {
                    if 0 < i {
                        write!(f, ", ")?;
                    }
                    self.display_nested(f, rest, offset + i * stride)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Display for DenseElementsAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let len = self.values.len();
        if len == 0 {
            return write!(f, "dense<> : {}", self.typ);
        }
        write!(f, "dense<")?;
        let is_splat = self.values.is_splat();
        match (self.static_shape(), self.num_elements()) {
            (Some(shape), Some(n)) if n == len && !(is_splat && 1 < len) => {
                self.display_nested(f, &shape, 0)?
            }
            _ if is_splat => write!(f, "{}", self.values.element(0))?,
            _ => {
                let elements = (0..len)
                    .map(|i| self.values.element(i))
                    .collect::<Vec<String>>();
                write!(f, "[{}]", elements.join(", "))?
            }
        }
        write!(f, "> : {}", self.typ)
    }
}

/// A dialect attribute without a more specific representation, such as
/// `#mhlo.sharding<"{replicated}">`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueAttr {
    dialect: String,
    body: String,
}

impl OpaqueAttr {
    pub fn new(dialect: &str, body: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            body: body.to_string(),
        }
    }
    pub fn dialect(&self) -> &str {
        &self.dialect
    }
}

impl Display for OpaqueAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}{}", self.dialect, self.body)
    }
}

/// Attributes are compile-time constants that are attached to operations.
///
/// Attributes are immutable and compared by value.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Unit,
    Bool(bool),
    Integer(IntegerAttr),
    Float(FloatAttr),
    String(String),
    SymbolRef(String),
    Type(Type),
    Array(Vec<Attribute>),
    Dictionary(Attributes),
    DenseElements(DenseElementsAttr),
    /// Fixed-width integer array such as `array<i64: 1, 2>`.
    DenseArray(Vec<i64>),
    Enum(EnumAttr),
    Record(RecordAttr),
    Opaque(OpaqueAttr),
}

impl Attribute {
    pub fn string(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(value) => Some(value),
            _ => None,
        }
    }
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Attribute::Integer(integer) => Some(integer.value()),
            _ => None,
        }
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Unit => write!(f, "unit"),
            Attribute::Bool(value) => write!(f, "{value}"),
            Attribute::Integer(integer) => write!(f, "{integer}"),
            Attribute::Float(float) => write!(f, "{float}"),
            Attribute::String(value) => write!(f, "\"{}\"", escape(value)),
            Attribute::SymbolRef(name) => write!(f, "@{name}"),
            Attribute::Type(typ) => write!(f, "{typ}"),
            Attribute::Array(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<String>>();
                write!(f, "[{}]", elements.join(", "))
            }
            Attribute::Dictionary(attributes) => write!(f, "{attributes}"),
            Attribute::DenseElements(dense) => write!(f, "{dense}"),
            Attribute::DenseArray(values) => {
                if values.is_empty() {
                    write!(f, "array<i64>")
                } else {
                    let values = values
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<String>>();
                    write!(f, "array<i64: {}>", values.join(", "))
                }
            }
            Attribute::Enum(attr) => write!(f, "{attr}"),
            Attribute::Record(record) => write!(f, "{record}"),
            Attribute::Opaque(opaque) => write!(f, "{opaque}"),
        }
    }
}

/// Named attributes in insertion order.
///
/// Names are unique; inserting an existing name replaces the value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, Attribute)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn insert(&mut self, name: &str, attribute: Attribute) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = attribute,
            None => self.entries.push((name.to_string(), attribute)),
        }
    }
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, attribute)| attribute)
    }
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.entries.iter().map(|(name, attribute)| (name.as_str(), attribute))
    }
}

impl FromIterator<(String, Attribute)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Attribute)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, attribute) in iter {
            attributes.insert(&name, attribute);
        }
        attributes
    }
}

fn display_name(name: &str) -> String {
    let is_bare = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$');
    if is_bare && !name.is_empty() {
        name.to_string()
    } else {
        format!("\"{}\"", escape(name))
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, attribute)) in self.entries.iter().enumerate() {
            if 0 < i {
                write!(f, ", ")?;
            }
            match attribute {
                Attribute::Unit => write!(f, "{}", display_name(name))?,
                _ => write!(f, "{} = {attribute}", display_name(name))?,
            }
        }
        write!(f, "}}")
    }
}

enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Parser {
    /// Parse an integer or float such as `42 : i32` or `-1.5 : f32`.
    fn parse_number(&mut self) -> Result<Attribute> {
        let token = self.peek().clone();
        let scalar = self.parse_scalar()?;
        let typ = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        match (scalar, typ) {
            (Scalar::Int(value), None) => Ok(Attribute::Integer(IntegerAttr::i64(value))),
            (Scalar::Int(value), Some(typ @ (Type::Integer(_) | Type::Index))) => {
                Ok(Attribute::Integer(IntegerAttr::new(value, typ)))
            }
            (Scalar::Int(value), Some(Type::Float(typ))) => {
                Ok(Attribute::Float(FloatAttr::new(value as f64, typ)))
            }
            (Scalar::Float(value), None) => {
                Ok(Attribute::Float(FloatAttr::new(value, FloatType::F64)))
            }
            (Scalar::Float(value), Some(Type::Float(typ))) => {
                Ok(Attribute::Float(FloatAttr::new(value, typ)))
            }
            (_, typ) => {
                let msg = match typ {
                    Some(typ) => format!("Invalid type {typ} for number"),
                    None => "Invalid number".to_string(),
                };
                Err(anyhow::anyhow!(self.error(&token, &msg)))
            }
        }
    }
    /// Parse `42`, `-1.5`, or `true`.
    fn parse_scalar(&mut self) -> Result<Scalar> {
        let negative = self.check(TokenKind::Minus);
        if negative {
            self.advance();
        }
        let token = self.peek().clone();
        let sign = if negative { -1 } else { 1 };
        let scalar = match token.kind {
            TokenKind::Integer => token.lexeme.parse::<i64>().ok().map(|v| Scalar::Int(sign * v)),
            TokenKind::FloatLiteral => token
                .lexeme
                .parse::<f64>()
                .ok()
                .map(|v| Scalar::Float(sign as f64 * v)),
            TokenKind::BareIdentifier if token.lexeme == "true" => Some(Scalar::Bool(true)),
            TokenKind::BareIdentifier if token.lexeme == "false" => Some(Scalar::Bool(false)),
            _ => None,
        };
        match scalar {
            Some(scalar) => {
                self.advance();
                Ok(scalar)
            }
            None => {
                let msg = format!("Expected number, but got \"{}\"", token.lexeme);
                Err(anyhow::anyhow!(self.error(&token, &msg)))
            }
        }
    }
    fn parse_dense_elements(&mut self, elements: &mut Vec<Scalar>) -> Result<()> {
        if self.check(TokenKind::Greater) {
            return Ok(());
        }
        if self.check(TokenKind::LBracket) {
            self.advance();
            while !self.check(TokenKind::RBracket) {
                self.parse_dense_elements(elements)?;
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenKind::RBracket)?;
        } else {
            elements.push(self.parse_scalar()?);
        }
        Ok(())
    }
    /// Parse `dense<[1, 2]> : tensor<2xi64>`, or `dense<>` without elements.
    fn parse_dense(&mut self) -> Result<Attribute> {
        let token = self.expect(TokenKind::BareIdentifier)?;
        self.expect(TokenKind::Less)?;
        let mut elements = vec![];
        self.parse_dense_elements(&mut elements)?;
        self.expect(TokenKind::Greater)?;
        self.expect(TokenKind::Colon)?;
        let typ = self.parse_type()?;
        let values = match elements.first() {
            Some(Scalar::Float(_)) => elements
                .iter()
                .map(|e| match e {
                    Scalar::Float(v) => Some(*v),
                    Scalar::Int(v) => Some(*v as f64),
                    Scalar::Bool(_) => None,
                })
                .collect::<Option<Vec<f64>>>()
                .map(DenseValues::Float),
            Some(Scalar::Bool(_)) => elements
                .iter()
                .map(|e| match e {
                    Scalar::Bool(v) => Some(*v),
                    _ => None,
                })
                .collect::<Option<Vec<bool>>>()
                .map(DenseValues::Bool),
            _ => elements
                .iter()
                .map(|e| match e {
                    Scalar::Int(v) => Some(*v),
                    _ => None,
                })
                .collect::<Option<Vec<i64>>>()
                .map(DenseValues::Int),
        };
        match values {
            Some(values) => Ok(Attribute::DenseElements(DenseElementsAttr::new(values, typ))),
            None => Err(anyhow::anyhow!(self.error(&token, "Mixed element kinds in dense"))),
        }
    }
    /// Parse `array<i64: 1, 2>`.
    fn parse_dense_array(&mut self) -> Result<Attribute> {
        self.expect(TokenKind::BareIdentifier)?;
        self.expect(TokenKind::Less)?;
        let typ = self.expect(TokenKind::IntType)?;
        if typ.lexeme != "i64" {
            let msg = "Only i64 arrays are supported";
            return Err(anyhow::anyhow!(self.error(&typ, msg)));
        }
        let mut values = vec![];
        if self.check(TokenKind::Colon) {
            self.advance();
            loop {
                match self.parse_scalar()? {
                    Scalar::Int(value) => values.push(value),
                    _ => return Err(anyhow::anyhow!(self.error(&typ, "Expected integer"))),
                }
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::Greater)?;
        Ok(Attribute::DenseArray(values))
    }
    fn parse_record_value(&mut self) -> Result<RecordValue> {
        let dim = |parser: &mut Parser| -> Result<Option<i64>> {
            if parser.check(TokenKind::Question) {
                parser.advance();
                return Ok(None);
            }
            let token = parser.peek().clone();
            match parser.parse_scalar()? {
                Scalar::Int(value) => Ok(Some(value)),
                _ => Err(anyhow::anyhow!(parser.error(&token, "Expected dimension"))),
            }
        };
        if self.check(TokenKind::LBracket) {
            self.advance();
            let mut dims = vec![];
            while !self.check(TokenKind::RBracket) {
                dims.push(dim(self)?);
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenKind::RBracket)?;
            Ok(RecordValue::Dims(dims))
        } else {
            Ok(RecordValue::Dim(dim(self)?))
        }
    }
    /// Parse the body of a record such as `<lhs_contracting_dimensions = [1]>`.
    fn parse_record(&mut self, namespace: Namespace, kind: RecordKind) -> Result<Attribute> {
        self.expect(TokenKind::Less)?;
        if self.check_lexeme(TokenKind::BareIdentifier, "raw") {
            self.advance();
        }
        let mut fields = vec![];
        while !self.check(TokenKind::Greater) {
            let name = self.expect(TokenKind::BareIdentifier)?;
            if !kind.fields().contains(&name.lexeme.as_str()) {
                let msg = format!("Unknown field {} in {}", name.lexeme, kind.mnemonic());
                return Err(anyhow::anyhow!(self.error(&name, &msg)));
            }
            self.expect(TokenKind::Equal)?;
            let value = self.parse_record_value()?;
            fields.push((name.lexeme.clone(), value));
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::Greater)?;
        Ok(Attribute::Record(RecordAttr::new(namespace, kind, fields)))
    }
    /// Parse `#mhlo<precision HIGH>` or `#stablehlo<...>`.
    ///
    /// Returns `None` when the enum or symbol is unknown.
    fn parse_enum(&mut self, namespace: Namespace) -> Option<Attribute> {
        if !self.check(TokenKind::Less) {
            return None;
        }
        self.advance();
        if !self.check(TokenKind::BareIdentifier) {
            return None;
        }
        let keyword = self.advance().lexeme.clone();
        if !self.check(TokenKind::BareIdentifier) {
            return None;
        }
        let symbol = self.advance().lexeme.clone();
        if !self.check(TokenKind::Greater) {
            return None;
        }
        self.advance();
        let kind = EnumKind::from_keyword(&keyword)?;
        EnumAttr::from_symbol(namespace, kind, &symbol).map(Attribute::Enum)
    }
    /// Read the raw text of an unknown dialect attribute.
    fn parse_opaque(&mut self) -> Result<Attribute> {
        let token = self.peek().clone();
        let mut cursor = self.cursor();
        cursor.advance();
        let name = cursor.identifier();
        let result = if cursor.peek() == '<' {
            cursor.balanced()
        } else {
            Ok(())
        };
        let end = cursor.pos();
        if let Err(e) = result {
            return Err(anyhow::anyhow!(self.error(&token, &e.to_string())));
        }
        let start = token.location.start() + 1 + name.len();
        let body = self.source_range(start, end);
        let (dialect, rest) = match name.split_once('.') {
            Some((dialect, rest)) => (dialect.to_string(), format!(".{rest}{body}")),
            None => (name.clone(), body),
        };
        self.skip_to(end);
        Ok(Attribute::Opaque(OpaqueAttr::new(&dialect, &rest)))
    }
    /// Parse an attribute that starts with `#`.
    fn parse_dialect_attribute(&mut self) -> Result<Attribute> {
        let mark = self.mark();
        self.expect(TokenKind::Hash)?;
        let name = self.peek().lexeme.clone();
        if let Some(namespace) = Namespace::from_name(&name) {
            self.advance();
            if let Some(attr) = self.parse_enum(namespace) {
                return Ok(attr);
            }
        } else if let Some((prefix, mnemonic)) = name.split_once('.') {
            let namespace = Namespace::from_name(prefix);
            let kind = RecordKind::from_mnemonic(mnemonic);
            if let (Some(namespace), Some(kind)) = (namespace, kind) {
                self.advance();
                return self.parse_record(namespace, kind);
            }
        }
        self.reset(mark);
        self.parse_opaque()
    }
    fn is_type_start(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::LParen | TokenKind::Exclamation | TokenKind::IntType => true,
            TokenKind::BareIdentifier => {
                let word = token.lexeme.as_str();
                matches!(word, "tensor" | "tuple" | "complex" | "index")
                    || FloatType::from_str(word).is_some()
            }
            _ => false,
        }
    }
    pub fn parse_attribute(&mut self) -> Result<Attribute> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::String => {
                self.advance();
                let text = &token.lexeme[1..token.lexeme.len() - 1];
                Ok(Attribute::String(unescape(text)))
            }
            TokenKind::AtIdentifier => {
                self.advance();
                Ok(Attribute::SymbolRef(token.lexeme[1..].to_string()))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = vec![];
                while !self.check(TokenKind::RBracket) {
                    elements.push(self.parse_attribute()?);
                    if !self.check(TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Attribute::Array(elements))
            }
            TokenKind::LBrace => Ok(Attribute::Dictionary(self.parse_attributes()?)),
            TokenKind::Integer | TokenKind::FloatLiteral | TokenKind::Minus => self.parse_number(),
            TokenKind::Hash => self.parse_dialect_attribute(),
            TokenKind::BareIdentifier if token.lexeme == "true" || token.lexeme == "false" => {
                self.advance();
                Ok(Attribute::Bool(token.lexeme == "true"))
            }
            TokenKind::BareIdentifier if token.lexeme == "unit" => {
                self.advance();
                Ok(Attribute::Unit)
            }
            TokenKind::BareIdentifier if token.lexeme == "dense" => self.parse_dense(),
            TokenKind::BareIdentifier if token.lexeme == "array" => self.parse_dense_array(),
            _ if self.is_type_start() => Ok(Attribute::Type(self.parse_type()?)),
            _ => {
                let msg = format!("Expected attribute, but got \"{}\"", token.lexeme);
                Err(anyhow::anyhow!(self.error(&token, &msg)))
            }
        }
    }
    /// Parse `{name = value, unit_name}`.
    pub fn parse_attributes(&mut self) -> Result<Attributes> {
        let mut attributes = Attributes::new();
        self.expect(TokenKind::LBrace)?;
        while !self.check(TokenKind::RBrace) {
            let token = self.peek().clone();
            let name = match token.kind {
                TokenKind::BareIdentifier | TokenKind::IntType => token.lexeme.clone(),
                TokenKind::String => unescape(&token.lexeme[1..token.lexeme.len() - 1]),
                _ => {
                    let msg = format!("Expected attribute name, but got \"{}\"", token.lexeme);
                    return Err(anyhow::anyhow!(self.error(&token, &msg)));
                }
            };
            self.advance();
            if attributes.get(&name).is_some() {
                let msg = format!("Duplicate attribute {name}");
                return Err(anyhow::anyhow!(self.error(&token, &msg)));
            }
            let attribute = if self.check(TokenKind::Equal) {
                self.advance();
                self.parse_attribute()?
            } else {
                Attribute::Unit
            };
            attributes.insert(&name, attribute);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RBrace)?;
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedExt;

    fn parse(src: &str) -> Attribute {
        let src = format!("{{a = {src}}}");
        let op = format!("\"test.op\"() {src} : () -> ()");
        let op = Parser::parse_single_op(&op).unwrap();
        let op = op.rd();
        op.attributes().get("a").unwrap().clone()
    }

    #[test]
    fn test_round_trip() {
        let srcs = [
            "42 : i32",
            "-3 : i64",
            "1.5 : f32",
            "true",
            "\"say \\\"hi\\\"\"",
            "@main",
            "[1 : i64, [\"a\"]]",
            "{b = 1 : i64, c}",
            "dense<[1, 2, 3]> : tensor<3xi64>",
            "dense<0> : tensor<2x2xi64>",
            "dense<[[1, 2], [3, 4]]> : tensor<2x2xi64>",
            "dense<1.0> : tensor<f32>",
            "dense<> : tensor<0xi64>",
            "array<i64: 1, 2>",
            "array<i64>",
            "#mhlo<comparison_direction GT>",
            "#stablehlo<precision HIGHEST>",
            "#mhlo.channel_handle<handle = 1, type = 2>",
            "#mhlo.conv<raw input_batch_dimension = 0, input_spatial_dimensions = [1, ?]>",
            "#mhlo.sharding<\"{replicated}\">",
            "#foo<bar <baz>>",
            "tensor<4xf32>",
            "(tensor<f32>) -> tensor<f32>",
        ];
        for src in srcs {
            assert_eq!(parse(src).to_string(), src);
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(parse("42"), Attribute::Integer(IntegerAttr::i64(42)));
        match parse("#mhlo<comparison_direction GT>") {
            Attribute::Enum(attr) => {
                assert_eq!(attr.namespace(), Namespace::Mhlo);
                assert_eq!(attr.kind(), EnumKind::ComparisonDirection);
                assert_eq!(attr.symbol(), Some("GT"));
            }
            attr => panic!("expected enum, got {attr}"),
        }
        match parse("#mhlo<domain_kind sharding>") {
            Attribute::Opaque(attr) => assert_eq!(attr.dialect(), "mhlo"),
            attr => panic!("expected opaque, got {attr}"),
        }
        match parse("dense<7> : tensor<3xi64>") {
            Attribute::DenseElements(dense) => {
                assert_eq!(dense.to_i64_vec(), Some(vec![7, 7, 7]));
            }
            attr => panic!("expected dense, got {attr}"),
        }
    }

    #[test]
    fn test_empty_dense() {
        for src in ["dense<> : tensor<0xi64>", "dense<[]> : tensor<0xi64>"] {
            let attr = parse(src);
            match &attr {
                Attribute::DenseElements(dense) => {
                    assert_eq!(dense.values(), &DenseValues::Int(vec![]));
                    assert_eq!(dense.to_i64_vec(), Some(vec![]));
                }
                attr => panic!("expected dense, got {attr}"),
            }
            assert_eq!(attr.to_string(), "dense<> : tensor<0xi64>");
        }
    }

    #[test]
    fn test_attributes_keep_order() {
        let mut attributes = Attributes::new();
        attributes.insert("z", Attribute::Bool(true));
        attributes.insert("a", Attribute::Unit);
        attributes.insert("z", Attribute::Bool(false));
        assert_eq!(attributes.to_string(), "{z = false, a}");
        assert_eq!(attributes.remove("z"), Some(Attribute::Bool(false)));
        assert_eq!(attributes.len(), 1);
    }
}

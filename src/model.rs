//! Input data model: the AST shapes and symbol table a host compiler's
//! front end would hand the analyzer. Parsing and semantic resolution
//! themselves are external collaborators (see `spec.md` §1) - this module
//! only defines the *shape* of what they produce.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeId = u32;
pub type SymbolId = u32;
pub type TypeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

/// One of the three attribute kinds the Annotation Reader matches by short
/// type name (`spec.md` §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    NotNull,
    CheckNull,
    IsNullCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    Property,
    /// A property `get`/`set` accessor method.
    PropertyAccessor,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    None,
    Ref,
    Out,
}

/// A resolved symbol: a local, parameter, field, property, accessor, or
/// method. This is the unit the Annotation Reader and Knowledge Base key
/// their lookups on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub name: String,
    /// Raw attribute type names as written at the declaration, e.g.
    /// `"NotNullAttribute"` or `"NotNull"`. Matched by short name only.
    pub attributes: Vec<String>,
    pub containing_type: Option<TypeId>,
    /// For Method/Property/PropertyAccessor(getter): the declared return
    /// (or property) type, used to decide value-type-ness and to unwrap
    /// `Task<T>`.
    pub declared_type: Option<TypeId>,
    /// Parameters, in declaration order (Method kind only).
    pub parameters: Vec<SymbolId>,
    pub parameter_index: Option<usize>,
    pub is_params: bool,
    pub ref_kind: RefKind,
    /// For an extension-method invocation's *reduced* symbol, the original
    /// (unreduced, ungenericized) static method definition. `None` when the
    /// symbol already is its own original definition.
    pub original_definition: Option<SymbolId>,
    /// For a property accessor, the property it implements (§4.2 linkage).
    pub associated_property: Option<SymbolId>,
    /// True for a local introduced by a `foreach` binding (`spec.md` §4.3.1;
    /// modeled as a typed field per the Design Notes' recommendation rather
    /// than a reflective probe).
    pub is_foreach_local: bool,
    /// True for the implicit `value` parameter of a property/indexer setter.
    pub is_setter_value_parameter: bool,
    /// For a setter's implicit value parameter: the setter method symbol
    /// itself and (if resolvable) its associated property, checked in that
    /// order by the classifier (§4.3.1).
    pub setter_method: Option<SymbolId>,
    /// True when this parameter belongs to a lambda expression.
    pub is_lambda_parameter: bool,
    /// The callee of the invocation this lambda is passed into as an
    /// argument, if any. Used to test "lambda sits inside an enumerable
    /// combinator invocation" and to locate the delegate parameter below.
    /// Populated by lambda-to-delegate conversion resolution, which is an
    /// external semantic-binding step (see DESIGN.md Open Questions).
    pub enclosing_invocation_callee: Option<SymbolId>,
    /// The resolved delegate-`Invoke` parameter symbol this lambda
    /// parameter converts to, if the enclosing argument converts to a
    /// delegate type.
    pub delegate_param_symbol: Option<SymbolId>,
}

impl Symbol {
    pub fn new(id: SymbolId, kind: SymbolKind, name: impl Into<String>) -> Self {
        Symbol {
            id,
            kind,
            name: name.into(),
            attributes: Vec::new(),
            containing_type: None,
            declared_type: None,
            parameters: Vec::new(),
            parameter_index: None,
            is_params: false,
            ref_kind: RefKind::None,
            original_definition: None,
            associated_property: None,
            is_foreach_local: false,
            is_setter_value_parameter: false,
            setter_method: None,
            is_lambda_parameter: false,
            enclosing_invocation_callee: None,
            delegate_param_symbol: None,
        }
    }

    pub fn with_attributes(mut self, attrs: impl IntoIterator<Item = &'static str>) -> Self {
        self.attributes = attrs.into_iter().map(String::from).collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    pub is_value_type: bool,
    /// Members (methods/properties) declared directly on this type, used by
    /// the Knowledge Base's name-based resolution and by `Task<T>`
    /// unwrapping (§4.3.4).
    pub members: Vec<SymbolId>,
    /// Generic type arguments, e.g. `Task<string>` -> `[string]`. Used only
    /// by `Task<T>` unwrapping's `GetAwaiter` probe.
    pub type_arguments: Vec<TypeId>,
}

impl TypeInfo {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        TypeInfo { id, name: name.into(), is_value_type: false, members: Vec::new(), type_arguments: Vec::new() }
    }

    pub fn value_type(id: TypeId, name: impl Into<String>) -> Self {
        TypeInfo { is_value_type: true, ..TypeInfo::new(id, name) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    NullLiteral,
    StringLiteral(String),
    InterpolatedString(Vec<Expression>),
    NameOf(String),
    /// `new T(...)`, `new T[...]`, or an implicit array/object creation.
    ObjectCreation { type_id: Option<TypeId>, args: Vec<Expression> },
    ArrayCreation { element_type: Option<TypeId>, elements: Vec<Expression> },
    This,
    Lambda { parameters: Vec<SymbolId>, body: Box<LambdaBody> },
    Throw(Option<Box<Expression>>),
    /// A bare identifier resolving to a local, parameter, field, property,
    /// or method-as-value.
    Identifier(SymbolId),
    Invocation { callee: SymbolId, receiver: Option<Box<Expression>>, args: Vec<Argument> },
    Assignment { target: Box<Expression>, value: Box<Expression> },
    MemberAccess { receiver: Box<Expression>, member: SymbolId },
    /// `a?.b` (or `a?[i]`): `when_not_null` is the continuation evaluated
    /// only when `receiver` is non-null.
    ConditionalAccess { receiver: Box<Expression>, when_not_null: Box<Expression> },
    /// The `.b` / `[i]` continuation bound to a conditional-access receiver.
    MemberBinding { member: SymbolId },
    Coalesce { left: Box<Expression>, right: Box<Expression> },
    Ternary { condition: Box<Expression>, then_branch: Box<Expression>, else_branch: Box<Expression> },
    Cast { type_id: Option<TypeId>, inner: Box<Expression> },
    Paren(Box<Expression>),
    /// `left as T`.
    As { left: Box<Expression>, type_id: Option<TypeId> },
    Await(Box<Expression>),
    Add { left: Box<Expression>, right: Box<Expression>, result_type: Option<TypeId>, is_tolist_call: bool },
    ElementAccess { receiver: Box<Expression>, index: Box<Expression> },
    Tuple(Vec<Expression>),
    PrefixUnary { op: String, operand: Box<Expression> },
    Binary { op: String, left: Box<Expression>, right: Box<Expression> },
    /// A node shape the classifier/underlying resolver does not recognize;
    /// always surfaces as a `ParseFailure` diagnostic rather than silently
    /// defaulting (`spec.md` §4.4, §7).
    Unknown { kind_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LambdaBody {
    Expression(Expression),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expression {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Self {
        Expression { id, span, kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argument {
    pub value: Expression,
    pub ref_kind: RefKind,
}

impl Argument {
    pub fn positional(value: Expression) -> Self {
        Argument { value, ref_kind: RefKind::None }
    }

    pub fn by_ref(value: Expression) -> Self {
        Argument { value, ref_kind: RefKind::Ref }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    Expression(Expression),
    VariableDecl { symbol: SymbolId, initializer: Option<Expression> },
    If { condition: Expression, then_branch: Vec<Statement>, else_branch: Option<Vec<Statement>> },
    While { condition: Expression, body: Vec<Statement> },
    Block(Vec<Statement>),
    Return(Option<Expression>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

impl Statement {
    pub fn new(id: NodeId, span: Span, kind: StmtKind) -> Self {
        Statement { id, span, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtorInitKind {
    This,
    Base,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorInitializer {
    pub id: NodeId,
    pub span: Span,
    pub kind: CtorInitKind,
    pub callee: SymbolId,
    pub args: Vec<Argument>,
}

/// One analyzable body: a method, constructor, or property/indexer
/// accessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodBody {
    pub owner: SymbolId,
    pub ctor_initializer: Option<ConstructorInitializer>,
    pub statements: Vec<Statement>,
}

/// The whole program under analysis: a flat symbol/type table plus every
/// analyzable body. Stands in for "a code block and its semantic model"
/// (`spec.md` §5) aggregated across a compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compilation {
    pub symbols: HashMap<SymbolId, Symbol>,
    pub types: HashMap<TypeId, TypeInfo>,
    pub bodies: Vec<MethodBody>,
}

impl Compilation {
    pub fn new() -> Self {
        Compilation::default()
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = symbol.id;
        self.symbols.insert(id, symbol);
        id
    }

    pub fn add_type(&mut self, ty: TypeInfo) -> TypeId {
        let id = ty.id;
        self.types.insert(id, ty);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn ty(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(&id)
    }

    /// Follow `original_definition` once, to the unreduced/ungenericized
    /// static definition the Knowledge Base keys its sets on (`spec.md`
    /// §4.1).
    pub fn original_of(&self, id: SymbolId) -> SymbolId {
        self.symbol(id).and_then(|s| s.original_definition).unwrap_or(id)
    }

    pub fn is_value_type(&self, type_id: Option<TypeId>) -> bool {
        type_id.and_then(|t| self.ty(t)).map(|t| t.is_value_type).unwrap_or(false)
    }

    pub fn is_string_type(&self, type_id: Option<TypeId>) -> bool {
        type_id.and_then(|t| self.ty(t)).map(|t| t.name == "string").unwrap_or(false)
    }

    /// `Task<T>` unwrapping (`spec.md` §4.3.4): probe for a `Result`
    /// property and a `GetAwaiter()` method on `type_id`; if `GetAwaiter`'s
    /// return's first type argument equals `Result`'s type, the unwrapped
    /// type is that type. Otherwise `type_id` is returned unchanged.
    pub fn unwrap_task(&self, type_id: TypeId) -> TypeId {
        let Some(ty) = self.ty(type_id) else { return type_id };
        let result_type = ty
            .members
            .iter()
            .filter_map(|m| self.symbol(*m))
            .find(|m| m.name == "Result")
            .and_then(|m| m.declared_type);
        let awaiter_type = ty
            .members
            .iter()
            .filter_map(|m| self.symbol(*m))
            .find(|m| m.name == "GetAwaiter")
            .and_then(|m| m.declared_type);
        let (Some(result_type), Some(awaiter_type)) = (result_type, awaiter_type) else {
            return type_id;
        };
        let awaiter_first_arg = self.ty(awaiter_type).and_then(|t| t.type_arguments.first().copied());
        if awaiter_first_arg == Some(result_type) {
            result_type
        } else {
            type_id
        }
    }
}

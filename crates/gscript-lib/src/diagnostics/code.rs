//! Diagnostic codes emitted by the parser and the analyzer.

use serde::Serialize;

use super::Severity;

/// Every diagnostic the analyzer can produce, in one place.
///
/// Codes are stable identifiers; the rendered message is composed from
/// [`DiagnosticCode::default_message`] plus the builder's context message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    // Parser
    ExpectedToken,
    ExpectedSemiColon,
    ExpectedScriptDefn,
    UnexpectedToken,
    UnclosedBlock,
    UnclosedDevBlock,
    BreakOutsideLoopOrSwitch,
    ContinueOutsideLoop,
    NestedDevBlock,
    InvalidUsingPath,

    // Signature pass
    ReservedSymbol,
    RedefinitionOfSymbol,

    // Dataflow
    UnusedParameter,
    UnusedVariable,
    UnusedUsing,
    DuplicateCaseLabel,
    UnreachableCase,
    MultipleDefaultLabels,
    NoImplicitConversionExists,
    OperatorNotSupportedOnTypes,
    CannotAssignToConstant,
    CannotAssignToReadOnlyProperty,
    CannotAssignToImmutableEntity,
    DoesNotContainMember,
    PredefinedFieldTypeMismatch,
    InvalidAssignmentTarget,
    TooFewArguments,
    TooManyArguments,
    UnverifiedArgumentCount,
    FunctionDoesNotExist,
    ClassDoesNotExist,
    ExpectedFunction,
    UnknownNamespace,
    DivisionByZero,
    PossibleUndefinedComparison,
    StoreFunctionAsPointer,
    AssignOnThreadedFunction,
    InvalidExpressionStatement,
    CannotEnumerateType,
    InvalidVectorComponent,
    ExpectedConstantExpression,

    // Fatal / budget
    InternalLimit,
}

impl DiagnosticCode {
    pub fn severity(self) -> Severity {
        use DiagnosticCode::*;
        match self {
            UnusedParameter | UnusedVariable | UnusedUsing | UnreachableCase
            | PossibleUndefinedComparison | StoreFunctionAsPointer | UnverifiedArgumentCount
            | InternalLimit => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn default_message(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            ExpectedToken => "expected token",
            ExpectedSemiColon => "expected ';'",
            ExpectedScriptDefn => "expected a directive, function or class definition",
            UnexpectedToken => "unexpected token",
            UnclosedBlock => "unclosed block; expected '}'",
            UnclosedDevBlock => "unclosed dev block; expected '#/'",
            BreakOutsideLoopOrSwitch => "'break' is only valid inside a loop or switch",
            ContinueOutsideLoop => "'continue' is only valid inside a loop",
            NestedDevBlock => "dev blocks cannot nest",
            InvalidUsingPath => "invalid script path",
            ReservedSymbol => "this name is reserved",
            RedefinitionOfSymbol => "symbol is already defined",
            UnusedParameter => "parameter is never read",
            UnusedVariable => "variable is never read",
            UnusedUsing => "script is never referenced",
            DuplicateCaseLabel => "duplicate case label",
            UnreachableCase => "case is unreachable",
            MultipleDefaultLabels => "switch already has a default label",
            NoImplicitConversionExists => "no implicit conversion exists",
            OperatorNotSupportedOnTypes => "operator is not supported on these operand types",
            CannotAssignToConstant => "cannot assign to a constant",
            CannotAssignToReadOnlyProperty => "cannot assign to a read-only property",
            CannotAssignToImmutableEntity => "cannot assign to a field of an immutable entity",
            DoesNotContainMember => "value does not contain this member",
            PredefinedFieldTypeMismatch => "value type does not match the predefined field type",
            InvalidAssignmentTarget => "expression is not assignable",
            TooFewArguments => "too few arguments",
            TooManyArguments => "too many arguments",
            UnverifiedArgumentCount => "argument count could not be verified for this built-in",
            FunctionDoesNotExist => "function does not exist",
            ClassDoesNotExist => "class does not exist",
            ExpectedFunction => "expected a function",
            UnknownNamespace => "unknown namespace",
            DivisionByZero => "division by zero",
            PossibleUndefinedComparison => {
                "operand may be undefined; use isdefined() to test for presence"
            }
            StoreFunctionAsPointer => "use '&' to store a function as a pointer",
            AssignOnThreadedFunction => "a threaded call does not produce a value",
            InvalidExpressionStatement => "expression cannot stand alone as a statement",
            CannotEnumerateType => "value of this type cannot be enumerated",
            InvalidVectorComponent => "vector components must be numbers",
            ExpectedConstantExpression => "expected a constant expression",
            InternalLimit => "analysis exceeded its internal iteration budget",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

//! Declarations and compilation units.

use crate::arena::SymbolId;
use crate::expr::Expr;
use crate::source::LineIndex;
use crate::stmt::BlockStmt;
use serde::{Deserialize, Serialize};
use text_size::TextRange;

/// One resolved source file, as handed over by the front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Source path, relative to the compilation root.
    pub file: String,
    pub line_index: LineIndex,
    pub members: Vec<MemberDecl>,
}

impl CompilationUnit {
    pub fn new(file: impl Into<String>) -> Self {
        CompilationUnit {
            file: file.into(),
            line_index: LineIndex::default(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemberDecl {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub symbol: SymbolId,
    pub members: Vec<MemberDecl>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub symbol: SymbolId,
    pub doc: Option<DocComment>,
    /// Qualified attribute names on the declaration, for `--export-attributes`.
    pub attributes: Vec<String>,
    pub members: Vec<TypeMember>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Ctor(CtorDecl),
    StaticCtor(StaticCtorDecl),
    Property(PropertyDecl),
    Event(EventDecl),
    Nested(TypeDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub symbol: SymbolId,
    pub init: Option<Expr>,
    pub doc: Option<DocComment>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub symbol: SymbolId,
    /// `None` for abstract and interface members.
    pub body: Option<BlockStmt>,
    pub doc: Option<DocComment>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtorDecl {
    pub symbol: SymbolId,
    pub initializer: Option<CtorInitializer>,
    pub body: BlockStmt,
    pub doc: Option<DocComment>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtorInitKind {
    Base,
    This,
}

/// Explicit `: base(…)` or `: this(…)` initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtorInitializer {
    pub kind: CtorInitKind,
    /// The constructor the initializer resolves to.
    pub ctor: SymbolId,
    pub args: Vec<Expr>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCtorDecl {
    pub symbol: SymbolId,
    pub body: BlockStmt,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub symbol: SymbolId,
    pub getter: Option<AccessorDecl>,
    pub setter: Option<AccessorDecl>,
    /// Auto-property initializer.
    pub init: Option<Expr>,
    pub doc: Option<DocComment>,
    pub span: TextRange,
}

/// A property or event accessor; a `None` body means an auto accessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessorDecl {
    pub body: Option<BlockStmt>,
    /// The implicit `value` parameter of setters and add/remove accessors.
    pub value_param: Option<SymbolId>,
    pub span: TextRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDecl {
    pub symbol: SymbolId,
    pub add: Option<AccessorDecl>,
    pub remove: Option<AccessorDecl>,
    pub doc: Option<DocComment>,
    pub span: TextRange,
}

/// A member's documentation comment, line by line with the triple-slash
/// markers already stripped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocComment {
    pub lines: Vec<String>,
}

impl DocComment {
    pub fn new(lines: Vec<String>) -> Self {
        DocComment { lines }
    }

    /// Whether the comment carries the given `@`-tag attribute.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.lines.iter().any(|l| l.contains(tag))
    }

    /// The lines with `@`-tag attribute lines removed, for rendering.
    pub fn display_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.trim_start().starts_with('@'))
    }
}

/// Attribute tag marking a member as excluded from emission.
pub const TAG_IGNORE: &str = "@CSharpLua.Ignore";
/// Attribute tag forcing accessor methods instead of a plain field.
pub const TAG_NO_FIELD: &str = "@CSharpLua.NoField";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_tags_detected_and_stripped() {
        let doc = DocComment::new(vec![
            "Frobnicates the widget.".to_string(),
            "@CSharpLua.NoField".to_string(),
        ]);
        assert!(doc.has_tag(TAG_NO_FIELD));
        assert!(!doc.has_tag(TAG_IGNORE));
        let shown: Vec<_> = doc.display_lines().collect();
        assert_eq!(shown, vec!["Frobnicates the widget."]);
    }
}

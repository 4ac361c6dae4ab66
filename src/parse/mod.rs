pub mod ast;
pub mod parser;
pub mod registry;
pub mod swift;
pub mod typescript;
pub mod walker;

pub use ast::{Ast, AstNode, NodeId, SourceSpan};
pub use parser::{
    DependencyRecord, ParserInfo, ParserMetadata, SourceParser, SymbolKind, SymbolRecord,
};
pub use registry::{global, ParserRegistry};
pub use swift::SwiftParser;
pub use typescript::TypeScriptParser;
pub use walker::{DiscoveredFile, FileWalker};

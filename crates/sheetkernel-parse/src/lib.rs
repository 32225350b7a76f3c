mod hasher;
pub mod parser;
pub mod tokenizer;
pub mod types;

pub use parser::{ASTNode, ASTNodeType, parse};
pub use tokenizer::{Token, TokenSubType, TokenType, Tokenizer, TokenizerError};
pub use types::ParsingError;

// Re-export common types
pub use sheetkernel_common::{ArgKind, ExcelError, ExcelErrorKind, LiteralValue};

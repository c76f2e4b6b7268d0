//! 编译模块：将原始签名编译为可执行的模式
pub mod pattern;
pub mod compiler;
pub mod dom;

pub use self::pattern::{
    CompiledPattern, PatternMap, DomCheck, DomMode, DomRule, MAIN_KEY, DEFAULT_CONFIDENCE,
};
pub use self::compiler::{PatternCompiler, CompileStats};
pub use self::dom::DomCompiler;

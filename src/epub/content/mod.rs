//! 章节内容模块
//!
//! 把章节XHTML转换为带样式的 [`ContentNode`] 树。

pub mod node;
pub mod style;
pub mod transform;

pub use node::{Align, Chapter, ContentNode, Edges, HeadingLevel, LinkTarget, Style, TextType};
pub use style::StyleResolver;
pub use transform::{ChapterContext, check_well_formed};

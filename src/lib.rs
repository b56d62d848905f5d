pub mod epub;

// === 核心API重新导出 ===

/// EPUB读取器（主要接口）
pub use epub::EpubReader;

/// 加载结果
pub use epub::Book;

/// 错误处理
pub use epub::{EpubError, ParseWarning, Result};

/// 配置
pub use epub::{ArchiveConfig, EpubConfig, MetadataConfig, StyleConfig};

// === 数据结构 ===

/// 清单资源
pub use epub::{EpubResource, MediaType};

/// 章节内容
pub use epub::{Align, Chapter, ContentNode, Edges, HeadingLevel, LinkTarget, Style, TextType};

// === 底层组件（高级用法） ===

/// 容器组件
pub use epub::{Container, PackageLocation, RootFile};

/// OPF组件
pub use epub::{
    Author,
    EventDate,
    GuideReference,
    Identifier,
    Manifest,
    Meta,
    Metadata,
    PackageDocument,
    Spine,
    SpineReference,
};

/// 目录组件
pub use epub::{TableOfContents, TocReference, TocStatistics, TocTree, TocTreeStyle};

/// CSS组件
pub use epub::Stylesheet;

// === 库信息 ===

/// epubforge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// epubforge库的描述
pub const DESCRIPTION: &str = "EPUB解析库：把EPUB文件转换为书籍模型和带样式的内容节点";

// === 便捷函数 ===

/// 使用默认配置读取EPUB文件
///
/// 这是 `EpubReader::new().read_epub(path)` 的便捷包装函数。
///
/// # 参数
/// * `path` - EPUB文件路径
///
/// # 返回值
/// * `Result<Book>` - 加载好的书籍
///
/// # 示例
///
/// ```no_run
/// let book = epubforge::open("book.epub")?;
/// println!("书名: {}", book.title());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Book> {
    EpubReader::new().read_epub(path)
}

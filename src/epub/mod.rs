pub mod archive;
pub mod book;
pub mod config;
pub mod container;
pub mod content;
pub mod css;
pub mod error;
pub mod media_type;
pub mod opf;
pub mod reader;
pub mod resource;
pub mod toc;
pub(crate) mod xml;

// 重新导出错误处理
pub use error::{EpubError, ParseWarning, Result};

// 重新导出读取器和书籍
pub use book::Book;
pub use reader::EpubReader;

// 重新导出配置
pub use config::{ArchiveConfig, EpubConfig, MetadataConfig, StyleConfig};

// 重新导出容器相关
pub use container::{Container, PackageLocation, RootFile};

// 重新导出资源相关
pub use media_type::MediaType;
pub use resource::EpubResource;

// 重新导出OPF相关
pub use opf::{
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

// 重新导出目录相关
pub use toc::{
    TableOfContents,
    TocReference,
    TocStatistics,
    TocTree,
    TocTreeStyle,
};

// 重新导出章节内容
pub use content::{
    Align,
    Chapter,
    ContentNode,
    Edges,
    HeadingLevel,
    LinkTarget,
    Style,
    TextType,
};
pub use css::Stylesheet;

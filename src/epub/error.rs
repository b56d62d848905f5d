use std::io;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Epub相关的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("无效的路径: {0}")]
    InvalidPath(String),

    #[error("书籍不可用: {0}")]
    BookNotAvailable(String),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("NCX文件解析错误: {0}")]
    NcxParseError(String),

    #[error("导航文档解析错误: {0}")]
    NavParseError(String),

    #[error("章节解析错误: {0}")]
    ChapterParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),
}

/// 解析过程中的降级记录
///
/// 这些情况不会中断整本书的加载，但会被记录到 `Book::warnings` 中，
/// 方便调用方判断哪些字段使用了默认值。
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ParseWarning {
    #[error("spine引用了不存在的清单项: {idref}")]
    UnresolvedSpineItem { idref: String },

    #[error("目录不可用: {reason}")]
    TocUnavailable { reason: String },

    #[error("样式表不可用 {href}: {reason}")]
    StylesheetUnavailable { href: String, reason: String },

    #[error("未找到封面图片")]
    CoverNotFound,
}

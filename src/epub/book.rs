//! 书籍聚合
//!
//! [`Book`] 是一次加载的全部结果。它只持有自有数据，可以在线程间共享。

use crate::epub::error::ParseWarning;
use crate::epub::opf::{GuideReference, Manifest, Metadata, Spine};
use crate::epub::resource::EpubResource;
use crate::epub::toc::{TocReference, TocStatistics};
use serde::Serialize;
use std::path::PathBuf;

/// 一本已加载的EPUB书籍
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    /// OPF包文件本身
    pub opf_resource: EpubResource,
    /// 目录资源（NCX或导航文档）
    pub toc_resource: Option<EpubResource>,
    /// 书名标识：epub文件名去掉扩展名
    pub name: String,
    /// EPUB版本，2.0或3.0
    pub version: f64,
    pub manifest: Manifest,
    pub metadata: Option<Metadata>,
    pub spine: Option<Spine>,
    pub cover_image: Option<EpubResource>,
    /// 样式表原文，没有样式表时为空字符串
    pub css_string: String,
    pub table_of_contents: Vec<TocReference>,
    /// 资源基础路径（OPF所在目录）
    pub resource_base: PathBuf,
    /// NCX的docTitle
    pub toc_title: Option<String>,
    pub guide: Vec<GuideReference>,
    /// 加载过程中的降级记录
    pub warnings: Vec<ParseWarning>,
}

impl Book {
    /// 书名：优先使用元数据中的标题，没有时使用文件名
    pub fn title(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(Metadata::title)
            .unwrap_or(&self.name)
    }

    /// 按阅读顺序排列的章节资源
    pub fn chapters(&self) -> Vec<&EpubResource> {
        self.spine
            .as_ref()
            .map(|spine| spine.iter().map(|reference| &reference.resource).collect())
            .unwrap_or_default()
    }

    /// 按清单ID查找资源
    pub fn resource(&self, id: &str) -> Option<&EpubResource> {
        self.manifest.find_by_id(id)
    }

    pub fn toc_statistics(&self) -> TocStatistics {
        TocStatistics::collect(&self.table_of_contents)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

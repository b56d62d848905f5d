//! 导引模块
//!
//! EPUB2 `<guide>` 中的 `<reference>` 条目（封面、目录、正文起始等）。

use crate::epub::resource::EpubResource;
use serde::Serialize;

/// 导引条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideReference {
    /// 类型(如cover、toc、text)
    pub reference_type: String,
    pub title: Option<String>,
    /// 原始href（相对OPF）
    pub href: String,
    /// href指向的清单资源
    pub resource: Option<EpubResource>,
    pub fragment_id: Option<String>,
}

impl GuideReference {
    /// 是否为指定类型（不区分大小写）
    pub fn is_type(&self, reference_type: &str) -> bool {
        self.reference_type.eq_ignore_ascii_case(reference_type)
    }
}

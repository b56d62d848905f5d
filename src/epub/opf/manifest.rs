//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义，以及在清单上的各种查找操作。
//! 其他模块都通过这里把清单引用转换为具体的资源。

use crate::epub::media_type::MediaType;
use crate::epub::resource::{EpubResource, join_href, normalize_href, strip_parent_segments};
use serde::Serialize;

/// 清单：按文档顺序保存的所有资源
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub resources: Vec<EpubResource>,
}

impl Manifest {
    /// 创建空清单
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加资源
    pub fn push(&mut self, resource: EpubResource) {
        self.resources.push(resource);
    }

    /// 资源数量
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// 清单是否为空
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// 按文档顺序遍历资源
    pub fn iter(&self) -> impl Iterator<Item = &EpubResource> {
        self.resources.iter()
    }

    /// 根据ID查找资源
    ///
    /// # 参数
    /// * `id` - 清单项ID
    ///
    /// # 返回值
    /// * `Option<&EpubResource>` - 第一个匹配的资源
    pub fn find_by_id(&self, id: &str) -> Option<&EpubResource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// 查找第一个包含指定属性的资源
    pub fn find_by_property(&self, property: &str) -> Option<&EpubResource> {
        self.resources.iter().find(|r| r.has_property(property))
    }

    /// 查找第一个指定媒体类型的资源
    pub fn find_by_media_type(&self, media_type: &MediaType) -> Option<&EpubResource> {
        self.resources.iter().find(|r| r.media_type == *media_type)
    }

    /// 查找第一个默认扩展名匹配的资源
    pub fn find_by_extension(&self, extension: &str) -> Option<&EpubResource> {
        let extension = extension.trim_start_matches('.');
        self.resources
            .iter()
            .find(|r| r.media_type.default_extension.eq_ignore_ascii_case(extension))
    }

    /// 查找第一个ID包含指定片段并满足条件的资源
    pub fn find_id_containing<F>(&self, needle: &str, predicate: F) -> Option<&EpubResource>
    where
        F: Fn(&EpubResource) -> bool,
    {
        self.resources
            .iter()
            .find(|r| r.id.contains(needle) && predicate(r))
    }

    /// 根据href查找资源
    ///
    /// 比较前双方都会规范化（百分号解码、去掉片段与开头的 `../`）。
    /// 完全匹配失败时，再按路径后缀匹配一次，以兼容写法不规范的链接。
    pub fn find_by_href(&self, href: &str) -> Option<&EpubResource> {
        let target = normalize_href(strip_parent_segments(href));
        if target.is_empty() {
            return None;
        }

        if let Some(found) = self
            .resources
            .iter()
            .find(|r| normalize_href(&r.href) == target)
        {
            return Some(found);
        }

        let target_suffix = format!("/{}", target);
        self.resources.iter().find(|r| {
            let candidate = normalize_href(&r.href);
            candidate.ends_with(&target_suffix) || target.ends_with(&format!("/{}", candidate))
        })
    }

    /// 以某个文档为起点解析相对链接
    ///
    /// # 参数
    /// * `document_href` - 链接所在文档的href（相对OPF）
    /// * `href` - 文档中的链接，可能带有片段
    ///
    /// # 返回值
    /// * `Option<&EpubResource>` - 先按文档目录解析，失败后退回 `find_by_href`
    pub fn resolve_relative(&self, document_href: &str, href: &str) -> Option<&EpubResource> {
        let joined = join_href(document_href, href);
        self.resources
            .iter()
            .find(|r| normalize_href(&r.href) == joined)
            .or_else(|| self.find_by_href(href))
    }

    /// 所有图片资源
    pub fn images(&self) -> Vec<&EpubResource> {
        self.resources
            .iter()
            .filter(|r| r.media_type.is_image())
            .collect()
    }
}

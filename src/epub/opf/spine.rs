//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use crate::epub::resource::EpubResource;
use serde::Serialize;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpineReference {
    /// 引用的清单资源
    pub resource: EpubResource,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineReference {
    /// 创建新的脊柱项
    pub fn new(resource: EpubResource) -> Self {
        Self {
            resource,
            linear: true,
        }
    }

    /// 创建指定线性属性的脊柱项
    pub fn with_linear(resource: EpubResource, linear: bool) -> Self {
        Self { resource, linear }
    }
}

/// 阅读顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spine {
    /// EPUB2 `<spine toc="...">` 指向的清单ID
    pub toc: Option<String>,
    pub spine_references: Vec<SpineReference>,
}

impl Spine {
    pub fn len(&self) -> usize {
        self.spine_references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spine_references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpineReference> {
        self.spine_references.iter()
    }

    /// 只包含线性阅读的项
    pub fn linear(&self) -> impl Iterator<Item = &SpineReference> {
        self.spine_references.iter().filter(|r| r.linear)
    }

    /// 资源在阅读顺序中的位置
    pub fn position_of(&self, resource_id: &str) -> Option<usize> {
        self.spine_references
            .iter()
            .position(|r| r.resource.id == resource_id)
    }

    /// 下一章
    pub fn next_after(&self, resource_id: &str) -> Option<&SpineReference> {
        self.position_of(resource_id)
            .and_then(|index| self.spine_references.get(index + 1))
    }
}

//! 资源模块
//!
//! 清单中单个资源的表示，以及相对路径的解析工具。

use crate::epub::media_type::MediaType;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 清单中的一个资源
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpubResource {
    /// 清单项ID
    pub id: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
    /// 媒体类型
    pub media_type: MediaType,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 解析后的绝对路径
    pub full_href: PathBuf,
}

impl EpubResource {
    /// 创建新的资源，`full_href` 由资源基础路径和 `href` 计算得出
    pub fn new(
        id: String,
        href: String,
        media_type: &str,
        properties: Option<String>,
        resource_base: &Path,
    ) -> Self {
        let media_type = MediaType::by(media_type, Some(&href));
        let full_href = resolve_href(resource_base, &href);
        Self {
            id,
            properties,
            media_type,
            href,
            full_href,
        }
    }

    /// 创建包内资源，`full_href` 不会越出 `package_root`（EPUB解压根目录）
    pub fn in_package(
        id: String,
        href: String,
        media_type: &str,
        properties: Option<String>,
        resource_base: &Path,
        package_root: &Path,
    ) -> Self {
        let full_href = resolve_href_within(package_root, resource_base, &href);
        Self {
            full_href,
            ..Self::new(id, href, media_type, properties, resource_base)
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        if let Some(properties) = &self.properties {
            properties.split_whitespace().any(|p| p == property)
        } else {
            false
        }
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 文件扩展名（小写，不含点）
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.href)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// 百分号解码
pub fn decode_href(href: &str) -> String {
    percent_decode_str(href).decode_utf8_lossy().to_string()
}

/// 把相对路径解析为基础目录下的绝对路径
///
/// 路径会先做百分号解码，`.` 与 `..` 按字面处理，不访问文件系统。
/// 同样的输入总是得到同样的结果。
pub fn resolve_href(base: &Path, href: &str) -> PathBuf {
    let decoded = decode_href(strip_fragment(href));
    let mut path = base.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            other => path.push(other),
        }
    }
    path
}

/// 把相对路径解析为 `base` 下的绝对路径，`..` 最多回退到 `root`
///
/// 用于清单等来自书籍内容的路径：`../../../etc/passwd` 这样的href
/// 会停在 `root` 上，不会指向解压目录之外的文件。
/// `base` 不在 `root` 之下时从 `root` 开始解析。
pub fn resolve_href_within(root: &Path, base: &Path, href: &str) -> PathBuf {
    let decoded = decode_href(strip_fragment(href));
    let mut path = if base.starts_with(root) {
        base.to_path_buf()
    } else {
        root.to_path_buf()
    };
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if path != root {
                    path.pop();
                }
            }
            other => path.push(other),
        }
    }
    path
}

/// 规范化相对路径以便比较
///
/// 解码后去掉开头的 `./` 与 `../`，并折叠中间的 `dir/..`。
pub fn normalize_href(href: &str) -> String {
    let decoded = decode_href(strip_fragment(href));
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// 以某个文档为起点解析相对链接，结果仍是相对OPF的路径
///
/// # 参数
/// * `document_href` - 链接所在文档的href（相对OPF）
/// * `href` - 文档中的相对链接
pub fn join_href(document_href: &str, href: &str) -> String {
    let dir = match document_href.rfind('/') {
        Some(index) => &document_href[..index + 1],
        None => "",
    };
    normalize_href(&format!("{}{}", dir, href))
}

/// 去掉 `#` 之后的片段
pub fn strip_fragment(href: &str) -> &str {
    match href.find('#') {
        Some(index) => &href[..index],
        None => href,
    }
}

/// 以 `#` 拆分路径与片段标识
pub fn split_fragment(href: &str) -> (String, Option<String>) {
    match href.split_once('#') {
        Some((path, fragment)) => {
            let fragment = if fragment.is_empty() {
                None
            } else {
                Some(fragment.to_string())
            };
            (path.to_string(), fragment)
        }
        None => (href.to_string(), None),
    }
}

/// 去掉开头所有的 `../` 段
pub fn strip_parent_segments(href: &str) -> &str {
    let mut rest = href;
    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else {
            return rest;
        }
    }
}

/// 路径是否为绝对路径或者外部链接
pub fn is_external(href: &str) -> bool {
    href.contains("://") || href.starts_with("mailto:") || href.starts_with("data:")
}

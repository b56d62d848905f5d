//! 目录模块
//!
//! 根据目录资源的类型选择NCX或EPUB3导航文档的解析方式，
//! 把结果转换为指向清单资源的 [`TocReference`] 森林。

pub mod nav_doc;
pub mod navigation;
pub mod ncx;
pub mod reference;

pub use nav_doc::{NavItem, parse_nav_document};
pub use navigation::{DocTitle, NavContent, NavLabel, NavMap, NavPoint, NcxMetadata};
pub use ncx::Ncx;
pub use reference::{TocBuilder, TocReference, TocStatistics, TocTree, TocTreeStyle};

use crate::epub::error::{ParseWarning, Result};
use crate::epub::media_type::NCX;
use crate::epub::opf::Manifest;
use crate::epub::resource::EpubResource;
use std::fs;

/// 目录构建结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOfContents {
    pub references: Vec<TocReference>,
    /// NCX的docTitle
    pub title: Option<String>,
    /// 目录不可用时的降级记录
    pub warning: Option<ParseWarning>,
}

impl TableOfContents {
    fn unavailable(reason: String) -> Self {
        tracing::warn!("目录不可用: {}", reason);
        Self {
            warning: Some(ParseWarning::TocUnavailable { reason }),
            ..Self::default()
        }
    }
}

/// 目录资源是否为NCX
pub fn is_ncx(resource: &EpubResource) -> bool {
    resource.media_type == *NCX || resource.media_type.default_extension == "ncx"
}

/// 读取并解析目录资源
///
/// 目录缺失、无法读取或无法识别时返回空森林并附带警告，不会中断整本书的加载。
///
/// # 参数
/// * `toc_resource` - OPF解析得到的目录资源
/// * `manifest` - 用于解析链接的清单
pub fn build_table_of_contents(
    toc_resource: Option<&EpubResource>,
    manifest: &Manifest,
) -> TableOfContents {
    let Some(resource) = toc_resource else {
        return TableOfContents::unavailable("清单中没有目录资源".to_string());
    };

    let content = match fs::read_to_string(&resource.full_href) {
        Ok(content) => content,
        Err(e) => {
            return TableOfContents::unavailable(format!("{}: {}", resource.href, e));
        }
    };

    match parse_table_of_contents(resource, &content, manifest) {
        Ok(toc) if toc.references.is_empty() => {
            let mut empty = TableOfContents::unavailable(format!("{} 中没有目录条目", resource.href));
            empty.title = toc.title;
            empty
        }
        Ok(toc) => {
            tracing::debug!("目录解析完成: {}", TocStatistics::collect(&toc.references));
            toc
        }
        Err(e) => TableOfContents::unavailable(e.to_string()),
    }
}

/// 解析已经读入内存的目录文档
pub fn parse_table_of_contents(
    resource: &EpubResource,
    content: &str,
    manifest: &Manifest,
) -> Result<TableOfContents> {
    let builder = TocBuilder::new(manifest, &resource.href);

    if is_ncx(resource) {
        let ncx = Ncx::parse_xml(content)?;
        Ok(TableOfContents {
            references: ncx
                .nav_map
                .nav_points
                .iter()
                .map(|point| builder.from_nav_point(point))
                .collect(),
            title: ncx.get_title().map(str::to_string),
            warning: None,
        })
    } else {
        let items = parse_nav_document(content)?;
        Ok(TableOfContents {
            references: items.iter().map(|item| builder.from_nav_item(item)).collect(),
            title: None,
            warning: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn resource(id: &str, href: &str, media_type: &str, base: &Path) -> EpubResource {
        EpubResource::new(id.to_string(), href.to_string(), media_type, None, base)
    }

    #[test]
    fn test_ncx_forest_shape() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let ncx = resource("ncx", "toc.ncx", "application/x-dtbncx+xml", base);
        let mut manifest = Manifest::new();
        manifest.push(ncx.clone());
        for id in ["ch1", "ch2", "ch3", "ch4", "ch5"] {
            manifest.push(resource(id, &format!("Text/{}.xhtml", id), "application/xhtml+xml", base));
        }

        fs::write(
            &ncx.full_href,
            r#"<ncx><docTitle><text>Book</text></docTitle><navMap>
<navPoint id="a"><navLabel><text>A</text></navLabel><content src="Text/ch1.xhtml"/>
  <navPoint id="a1"><navLabel><text>A1</text></navLabel><content src="Text/ch2.xhtml#x"/></navPoint>
</navPoint>
<navPoint id="b"><navLabel><text>B</text></navLabel><content src="Text/ch3.xhtml"/>
  <navPoint id="b1"><navLabel><text>B1</text></navLabel><content src="Text/ch4.xhtml"/></navPoint>
</navPoint>
<navPoint id="c"><navLabel><text>C</text></navLabel><content src="Text/gone.xhtml"/></navPoint>
</navMap></ncx>"#,
        )
        .unwrap();

        let toc = build_table_of_contents(Some(&ncx), &manifest);
        assert!(toc.warning.is_none());
        assert_eq!(toc.title.as_deref(), Some("Book"));

        let shape: Vec<usize> = toc.references.iter().map(|r| r.children.len()).collect();
        assert_eq!(shape, vec![1, 1, 0]);
        assert_eq!(toc.references[0].children[0].fragment_id.as_deref(), Some("x"));
        assert_eq!(
            toc.references[1].children[0].resource.as_ref().map(|r| r.id.as_str()),
            Some("ch4")
        );
        assert!(toc.references[2].resource.is_none());
    }

    #[test]
    fn test_nav_document_mode() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let nav = resource("nav", "Text/nav.xhtml", "application/xhtml+xml", base);
        let mut manifest = Manifest::new();
        manifest.push(nav.clone());
        manifest.push(resource("ch1", "Text/ch1.xhtml", "application/xhtml+xml", base));

        let content = r#"<html><body><nav epub:type="toc"><ol>
<li><a href="ch1.xhtml">One</a></li><li><a href="../Text/ch1.xhtml#end">End</a></li>
</ol></nav></body></html>"#;

        let toc = parse_table_of_contents(&nav, content, &manifest).expect("解析目录失败");
        assert_eq!(toc.references.len(), 2);
        assert!(toc.references.iter().all(|r| r.resource.as_ref().map(|r| r.id.as_str()) == Some("ch1")));
        assert_eq!(toc.references[1].fragment_id.as_deref(), Some("end"));
    }

    #[test]
    fn test_missing_or_broken_toc_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new();

        let toc = build_table_of_contents(None, &manifest);
        assert!(toc.references.is_empty());
        assert!(matches!(toc.warning, Some(ParseWarning::TocUnavailable { .. })));

        let missing = resource("ncx", "toc.ncx", "application/x-dtbncx+xml", dir.path());
        let toc = build_table_of_contents(Some(&missing), &manifest);
        assert!(toc.references.is_empty());
        assert!(toc.warning.is_some());

        fs::write(&missing.full_href, "<ncx><navMap><navPoint>").unwrap();
        let toc = build_table_of_contents(Some(&missing), &manifest);
        assert!(toc.references.is_empty());
        assert!(toc.warning.is_some());
    }
}

//! EPUB3导航文档解析
//!
//! 在导航文档中找到目录 `<nav>`，把其中嵌套的 `<ol><li>` 列表解析为条目树。

use crate::epub::error::{EpubError, Result};
use scraper::{ElementRef, Html, Selector};

/// 导航文档中的一个条目
#[derive(Debug, Clone, PartialEq)]
pub struct NavItem {
    pub label: String,
    /// `<a href>` 的原始值，只有标题没有链接时为None
    pub href: Option<String>,
    pub children: Vec<NavItem>,
}

/// 解析导航文档
///
/// # 参数
/// * `html` - 导航文档内容
///
/// # 返回值
/// * `Result<Vec<NavItem>>` - 找不到 `<nav>` 时返回 `NavParseError`
pub fn parse_nav_document(html: &str) -> Result<Vec<NavItem>> {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body")
        .map_err(|e| EpubError::NavParseError(format!("无效的选择器: {:?}", e)))?;

    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let nav = find_nav(root)
        .ok_or_else(|| EpubError::NavParseError("没有找到nav元素".to_string()))?;

    Ok(first_child_named(nav, "ol")
        .or_else(|| descendants_named(nav, "ol").next())
        .map(parse_list)
        .unwrap_or_default())
}

/// 查找目录nav元素
///
/// `epub:type` 包含 `toc` 的nav优先；否则取body下直接的nav，最后按深度优先取第一个。
fn find_nav(body: ElementRef<'_>) -> Option<ElementRef<'_>> {
    descendants_named(body, "nav")
        .find(|nav| is_toc_nav(*nav))
        .or_else(|| first_child_named(body, "nav"))
        .or_else(|| descendants_named(body, "nav").next())
}

fn is_toc_nav(nav: ElementRef<'_>) -> bool {
    nav.value().attrs().any(|(name, value)| {
        (name == "type" || name.ends_with(":type")) && value.split_whitespace().any(|v| v == "toc")
    })
}

fn parse_list(list: ElementRef<'_>) -> Vec<NavItem> {
    children_named(list, "li").map(parse_item).collect()
}

fn parse_item(item: ElementRef<'_>) -> NavItem {
    let anchor = first_child_named(item, "a");
    let heading = anchor.or_else(|| first_child_named(item, "span"));

    let label = heading
        .map(element_text)
        .unwrap_or_else(|| own_text(item));
    let href = anchor
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .filter(|h| !h.is_empty());
    let children = first_child_named(item, "ol")
        .map(parse_list)
        .unwrap_or_default();

    NavItem {
        label,
        href,
        children,
    }
}

fn children_named<'a>(parent: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

fn first_child_named<'a>(parent: ElementRef<'a>, name: &'a str) -> Option<ElementRef<'a>> {
    children_named(parent, name).next()
}

fn descendants_named<'a>(parent: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

/// 元素内全部文本，空白折叠为单个空格
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// 只取元素自身的文本节点（不含子列表）
fn own_text(element: ElementRef<'_>) -> String {
    let text: String = element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| String::from(&**t)))
        .collect();
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_document_tree() {
        let html = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Nav</title></head>
<body>
  <nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
  <section>
    <nav epub:type="toc" id="toc">
      <h1>Contents</h1>
      <ol>
        <li><a href="ch1.xhtml">Chapter
            One</a>
          <ol><li><a href="ch1.xhtml#s1">Section 1.1</a></li></ol>
        </li>
        <li><span>Part Two</span>
          <ol>
            <li><a href="ch2.xhtml">Chapter Two</a></li>
            <li><a href="ch3.xhtml">Chapter Three</a></li>
          </ol>
        </li>
        <li><a href="ch4.xhtml">Chapter Four</a></li>
      </ol>
    </nav>
  </section>
</body>
</html>"#;

        let items = parse_nav_document(html).expect("解析导航文档失败");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].label, "Chapter One");
        assert_eq!(items[0].href.as_deref(), Some("ch1.xhtml"));
        assert_eq!(items[0].children[0].href.as_deref(), Some("ch1.xhtml#s1"));
        assert_eq!(items[1].label, "Part Two");
        assert_eq!(items[1].href, None);
        assert_eq!(items[1].children.len(), 2);
        assert!(items[2].children.is_empty());
    }

    #[test]
    fn test_nav_directly_under_body_without_type() {
        let html = r#"<html><body><div><nav><ol><li><a href="deep.xhtml">Deep</a></li></ol></nav></div>
<nav><ol><li><a href="top.xhtml">Top</a></li></ol></nav></body></html>"#;

        let items = parse_nav_document(html).expect("解析导航文档失败");
        assert_eq!(items[0].label, "Top");
    }

    #[test]
    fn test_nav_found_by_depth_first_search() {
        let html = r#"<html><body><div><section><nav><ol><li><a href="a.xhtml">A</a></li></ol></nav></section></div></body></html>"#;
        let items = parse_nav_document(html).expect("解析导航文档失败");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].href.as_deref(), Some("a.xhtml"));
    }

    #[test]
    fn test_missing_nav_is_error() {
        let result = parse_nav_document("<html><body><p>nothing</p></body></html>");
        assert!(matches!(result, Err(EpubError::NavParseError(_))));
    }
}

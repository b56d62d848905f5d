//! HTML到内容节点的转换
//!
//! 按标签名分派，每个元素产生一个节点。不认识的标签产生空文本节点。

use crate::epub::config::StyleConfig;
use crate::epub::content::node::{ContentNode, HeadingLevel, LinkTarget, TextType};
use crate::epub::content::style::StyleResolver;
use crate::epub::css::Stylesheet;
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::Manifest;
use crate::epub::resource::{is_external, resolve_href, split_fragment, strip_parent_segments};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use scraper::{ElementRef, Html, Node, Selector};
use std::path::Path;

/// 生成Div节点的容器标签
const CONTAINER_TAGS: &[&str] = &[
    "div", "nav", "section", "figure", "article", "aside", "header", "footer", "main",
    "blockquote", "figcaption",
];

/// 转换一个章节所需的上下文
pub struct ChapterContext<'a> {
    pub manifest: &'a Manifest,
    /// 资源基础路径，图片路径基于它解析
    pub resource_base: &'a Path,
    pub stylesheet: &'a Stylesheet,
    pub style_config: &'a StyleConfig,
    /// 章节自身的href（相对OPF），链接相对于它解析
    pub document_href: &'a str,
}

impl ChapterContext<'_> {
    /// 转换整个文档的body
    pub fn transform_document(&self, html: &str) -> (Option<String>, Vec<ContentNode>) {
        let document = Html::parse_document(html);
        let resolver = StyleResolver::new(self.stylesheet, self.style_config);

        let body = select_first(&document, "body");
        let nodes = match body {
            Some(body) => self.block_children(body, &resolver),
            None => Vec::new(),
        };

        let title = select_first(&document, "title")
            .map(element_text)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                select_first(&document, "h1, h2, h3, h4")
                    .map(element_text)
                    .filter(|t| !t.is_empty())
            });

        (title, nodes)
    }

    /// 转换单个元素
    ///
    /// 元素样式只由自身的类型默认值、类和行内样式决定，与外层元素无关。
    pub fn transform_element(&self, element: ElementRef<'_>, resolver: &StyleResolver<'_>) -> ContentNode {
        let tag = element.value().name();

        if let Some(level) = HeadingLevel::from_tag(tag) {
            return ContentNode::Heading {
                level,
                text: element_text(element),
                style: resolver.heading(element.value(), level),
            };
        }

        match tag {
            "p" => {
                ContentNode::Paragraph {
                    style: resolver.block(element.value()),
                    children: self.inline_children(element, TextType::default(), resolver),
                }
            }
            "span" => self.span(element, TextType::default(), resolver),
            "ul" | "ol" => ContentNode::List {
                ordered: tag == "ol",
                items: element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .map(|item| self.transform_element(item, resolver))
                    .collect(),
            },
            "li" => self.list_item(element),
            "a" => self.link(element),
            "img" => self.image(element),
            "br" => ContentNode::LineBreak,
            "fieldset" => ContentNode::Fieldset {
                children: self.block_children(element, resolver),
            },
            _ if CONTAINER_TAGS.contains(&tag) => {
                ContentNode::Div {
                    style: resolver.block(element.value()),
                    padding: resolver.padding(element.value()),
                    children: self.block_children(element, resolver),
                }
            }
            _ => ContentNode::empty_text(),
        }
    }

    /// 块级容器的子节点：每个子元素一个节点，非空白的文本也保留
    fn block_children(&self, element: ElementRef<'_>, resolver: &StyleResolver<'_>) -> Vec<ContentNode> {
        element
            .children()
            .filter_map(|child| match child.value() {
                Node::Element(_) => ElementRef::wrap(child)
                    .map(|e| self.transform_element(e, resolver)),
                Node::Text(text) => {
                    let text = collapse_whitespace(text).trim().to_string();
                    (!text.is_empty()).then(|| ContentNode::text(text))
                }
                _ => None,
            })
            .collect()
    }

    /// 段落与span的行内子节点
    fn inline_children(
        &self,
        element: ElementRef<'_>,
        text_type: TextType,
        resolver: &StyleResolver<'_>,
    ) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        self.collect_inline(element, text_type, resolver, &mut nodes);
        trim_inline(nodes)
    }

    fn collect_inline(
        &self,
        element: ElementRef<'_>,
        text_type: TextType,
        resolver: &StyleResolver<'_>,
        nodes: &mut Vec<ContentNode>,
    ) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let text = collapse_whitespace(text);
                    if !text.is_empty() {
                        nodes.push(ContentNode::Text { text, text_type });
                    }
                }
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    match child.value().name() {
                        "a" => nodes.push(self.link(child)),
                        "span" => nodes.push(self.span(child, text_type, resolver)),
                        "br" => nodes.push(ContentNode::LineBreak),
                        "img" => nodes.push(self.image(child)),
                        tag => {
                            // 格式标签叠加标记，其他行内标签只贡献文本
                            let child_type = text_type.with_tag(tag);
                            self.collect_inline(child, child_type, resolver, nodes);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn span(&self, element: ElementRef<'_>, text_type: TextType, resolver: &StyleResolver<'_>) -> ContentNode {
        ContentNode::Span {
            style: resolver.block(element.value()),
            children: self.inline_children(element, text_type, resolver),
        }
    }

    fn list_item(&self, element: ElementRef<'_>) -> ContentNode {
        let anchor = element
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "a");

        match anchor {
            Some(anchor) => {
                let mut link = self.link(anchor);
                if let ContentNode::Link { text, .. } = &mut link {
                    if text.is_empty() {
                        *text = element_text(element);
                    }
                }
                link
            }
            None => ContentNode::ListItem {
                text: element_text(element),
            },
        }
    }

    fn link(&self, element: ElementRef<'_>) -> ContentNode {
        let href = element.value().attr("href").unwrap_or_default().to_string();
        ContentNode::Link {
            text: element_text(element),
            target: self.link_target(&href),
            href,
        }
    }

    /// 链接指向的清单资源，外部链接和无法解析的链接为None
    fn link_target(&self, href: &str) -> Option<LinkTarget> {
        if href.trim().is_empty() || is_external(href) {
            return None;
        }
        let (path, fragment) = split_fragment(href);
        let resource = if path.is_empty() {
            self.manifest.find_by_href(self.document_href)?
        } else {
            self.manifest.resolve_relative(self.document_href, href)?
        };
        Some(LinkTarget {
            resource_id: resource.id.clone(),
            fragment,
        })
    }

    fn image(&self, element: ElementRef<'_>) -> ContentNode {
        let raw_src = element.value().attr("src").unwrap_or_default();
        let src = strip_parent_segments(raw_src).to_string();
        ContentNode::Image {
            full_path: resolve_href(self.resource_base, &src),
            alt: element.value().attr("alt").map(str::to_string),
            src,
        }
    }
}

/// XHTML良构检查
///
/// HTML解析器会修复任何错误的标记，所以XHTML章节先用XML解析器检查一遍：
/// 标签必须配对且全部闭合。
pub fn check_well_formed(content: &str) -> Result<()> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                depth += 1;
                seen_root = true;
            }
            Ok(Event::Empty(_)) => seen_root = true,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(EpubError::ChapterParseError(format!(
                    "位置 {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(EpubError::ChapterParseError(format!(
            "文档提前结束，还有 {} 个元素未闭合",
            depth
        )));
    }
    if !seen_root {
        return Err(EpubError::ChapterParseError("文档中没有任何元素".to_string()));
    }
    Ok(())
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// 元素全部文本，空白折叠并去掉首尾
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
        .trim()
        .to_string()
}

/// 把连续空白折叠为一个空格（保留首尾的单个空格）
fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                result.push(' ');
            }
            in_space = true;
        } else {
            result.push(c);
            in_space = false;
        }
    }
    result
}

/// 去掉行内序列首尾的空白，丢弃变空的文本节点
fn trim_inline(mut nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    if let Some(ContentNode::Text { text, .. }) = nodes.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(ContentNode::Text { text, .. }) = nodes.last_mut() {
        *text = text.trim_end().to_string();
    }
    nodes.retain(|node| !node.is_empty_text());
    nodes
}

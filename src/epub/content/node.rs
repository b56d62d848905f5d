//! 章节内容节点
//!
//! 一个章节被转换为 [`ContentNode`] 树。每种节点只携带自己需要的字段。

use serde::Serialize;
use std::path::PathBuf;

/// 水平对齐
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Align {
    #[default]
    Leading,
    Center,
    Trailing,
}

/// 四边数值（外边距或内边距）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// 解析后的样式
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    /// 字号（点）
    pub font_size: f64,
    pub margin: Edges,
    pub align: Align,
}

impl Style {
    /// 指定字号、无外边距、左对齐的样式
    pub fn with_font_size(font_size: f64) -> Self {
        Self {
            font_size,
            margin: Edges::default(),
            align: Align::Leading,
        }
    }
}

/// 行内文本的格式标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextType {
    pub italic: bool,
    pub bold: bool,
    pub small: bool,
    pub superscript: bool,
    pub subscript: bool,
}

impl TextType {
    /// 没有任何格式
    pub fn is_plain(&self) -> bool {
        *self == TextType::default()
    }

    /// 叠加一个行内格式标签，非格式标签原样返回
    pub fn with_tag(mut self, tag: &str) -> Self {
        match tag {
            "em" | "i" => self.italic = true,
            "strong" | "b" => self.bold = true,
            "small" => self.small = true,
            "sup" => self.superscript = true,
            "sub" => self.subscript = true,
            _ => {}
        }
        self
    }

    /// 是否为格式标签
    pub fn is_format_tag(tag: &str) -> bool {
        matches!(tag, "em" | "i" | "strong" | "b" | "small" | "sup" | "sub")
    }
}

/// 标题级别，只支持1到4级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(Self::H1),
            "h2" => Some(Self::H2),
            "h3" => Some(Self::H3),
            "h4" => Some(Self::H4),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
        }
    }
}

/// 链接指向的清单资源
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTarget {
    pub resource_id: String,
    pub fragment: Option<String>,
}

/// 内容节点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Paragraph {
        style: Style,
        children: Vec<ContentNode>,
    },
    Heading {
        level: HeadingLevel,
        text: String,
        style: Style,
    },
    Span {
        style: Style,
        children: Vec<ContentNode>,
    },
    Image {
        /// 去掉开头 `../` 后的src
        src: String,
        /// 基于资源基础路径的绝对路径
        full_path: PathBuf,
        alt: Option<String>,
    },
    List {
        ordered: bool,
        items: Vec<ContentNode>,
    },
    ListItem {
        text: String,
    },
    Link {
        text: String,
        /// 原始href
        href: String,
        target: Option<LinkTarget>,
    },
    LineBreak,
    Fieldset {
        children: Vec<ContentNode>,
    },
    Div {
        style: Style,
        padding: Option<Edges>,
        children: Vec<ContentNode>,
    },
    Text {
        text: String,
        text_type: TextType,
    },
}

impl ContentNode {
    /// 无格式文本
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            text_type: TextType::default(),
        }
    }

    /// 不认识的标签产生的空文本
    pub fn empty_text() -> Self {
        Self::text(String::new())
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text { text, .. } if text.is_empty())
    }

    /// 节点类型名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::Span { .. } => "span",
            Self::Image { .. } => "image",
            Self::List { .. } => "list",
            Self::ListItem { .. } => "list_item",
            Self::Link { .. } => "link",
            Self::LineBreak => "line_break",
            Self::Fieldset { .. } => "fieldset",
            Self::Div { .. } => "div",
            Self::Text { .. } => "text",
        }
    }

    /// 样式，没有样式的节点返回None
    pub fn style(&self) -> Option<&Style> {
        match self {
            Self::Paragraph { style, .. }
            | Self::Heading { style, .. }
            | Self::Span { style, .. }
            | Self::Div { style, .. } => Some(style),
            _ => None,
        }
    }

    /// 子节点
    pub fn children(&self) -> &[ContentNode] {
        match self {
            Self::Paragraph { children, .. }
            | Self::Span { children, .. }
            | Self::Fieldset { children }
            | Self::Div { children, .. } => children,
            Self::List { items, .. } => items,
            _ => &[],
        }
    }

    /// 节点包含的纯文本
    pub fn plain_text(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, result: &mut String) {
        match self {
            Self::Heading { text, .. }
            | Self::ListItem { text }
            | Self::Link { text, .. }
            | Self::Text { text, .. } => result.push_str(text),
            Self::LineBreak => result.push('\n'),
            Self::Image { alt, .. } => {
                if let Some(alt) = alt {
                    result.push_str(alt);
                }
            }
            Self::List { items, .. } => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        result.push('\n');
                    }
                    item.collect_text(result);
                }
            }
            Self::Paragraph { children, .. }
            | Self::Span { children, .. }
            | Self::Fieldset { children }
            | Self::Div { children, .. } => {
                for child in children {
                    child.collect_text(result);
                }
            }
        }
    }
}

/// 一次章节解析的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    /// 清单ID
    pub id: String,
    /// `<title>` 或第一个标题的文本
    pub title: Option<String>,
    pub nodes: Vec<ContentNode>,
}

impl Chapter {
    /// 整章纯文本，块之间以换行分隔
    pub fn plain_text(&self) -> String {
        self.nodes
            .iter()
            .map(ContentNode::plain_text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
